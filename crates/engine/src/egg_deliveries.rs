//! Per-family delivery rows of an egg batch.
//!
//! The status is stored as a string plus the optional columns its variant
//! needs; [`Delivery`] is the typed view.

use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{Delivery, DeliveryStatus, EngineError, MoneyCents};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "egg_deliveries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub egg_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub family_id: String,
    pub status: String,
    pub amount: i64,
    pub resolved_at: Option<DateTimeUtc>,
    pub resolved_by: Option<String>,
    pub egg_price_minor: Option<i64>,
    pub cash_value_minor: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::eggs::Entity",
        from = "Column::EggId",
        to = "super::eggs::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Eggs,
}

impl Related<super::eggs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Eggs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<(Uuid, &Delivery)> for ActiveModel {
    fn from((egg_id, delivery): (Uuid, &Delivery)) -> Self {
        let (resolved_at, resolved_by, egg_price, cash_value) = match &delivery.status {
            DeliveryStatus::Pending => (None, None, None, None),
            DeliveryStatus::Delivered {
                delivered_at,
                confirmed_by,
            } => (Some(*delivered_at), Some(confirmed_by.clone()), None, None),
            DeliveryStatus::Rejected {
                rejected_at,
                rejected_by,
                egg_price,
                cash_value,
            } => (
                Some(*rejected_at),
                Some(rejected_by.clone()),
                Some(egg_price.cents()),
                Some(cash_value.cents()),
            ),
        };

        Self {
            egg_id: ActiveValue::Set(egg_id),
            family_id: ActiveValue::Set(delivery.family_id.clone()),
            status: ActiveValue::Set(delivery.status.as_str().to_string()),
            amount: ActiveValue::Set(delivery.amount),
            resolved_at: ActiveValue::Set(resolved_at),
            resolved_by: ActiveValue::Set(resolved_by),
            egg_price_minor: ActiveValue::Set(egg_price),
            cash_value_minor: ActiveValue::Set(cash_value),
        }
    }
}

impl TryFrom<Model> for Delivery {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let incomplete = || {
            EngineError::InvalidPayload(format!(
                "delivery {}/{} is missing resolution data",
                model.egg_id, model.family_id
            ))
        };
        let status = match model.status.as_str() {
            "pending" => DeliveryStatus::Pending,
            "delivered" => DeliveryStatus::Delivered {
                delivered_at: model.resolved_at.ok_or_else(incomplete)?,
                confirmed_by: model.resolved_by.clone().ok_or_else(incomplete)?,
            },
            "rejected" => DeliveryStatus::Rejected {
                rejected_at: model.resolved_at.ok_or_else(incomplete)?,
                rejected_by: model.resolved_by.clone().ok_or_else(incomplete)?,
                egg_price: MoneyCents::new(model.egg_price_minor.unwrap_or_default()),
                cash_value: MoneyCents::new(model.cash_value_minor.unwrap_or_default()),
            },
            other => {
                return Err(EngineError::InvalidPayload(format!(
                    "invalid delivery status: {other}"
                )));
            }
        };

        Ok(Self {
            family_id: model.family_id,
            amount: model.amount,
            status,
        })
    }
}
