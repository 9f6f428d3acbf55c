//! Egg production batches and their per-family deliveries.
//!
//! A batch freezes the number of families at production time, so the
//! per-family share stays the same when families are added or removed later.
//! Each family gets a [`Delivery`] which moves from `Pending` to either
//! `Delivered` or `Rejected`; both are terminal.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, allocation, egg_deliveries};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Delivered {
        delivered_at: DateTime<Utc>,
        confirmed_by: String,
    },
    Rejected {
        rejected_at: DateTime<Utc>,
        rejected_by: String,
        /// Price per egg at rejection time.
        egg_price: MoneyCents,
        cash_value: MoneyCents,
    },
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered { .. } => "delivered",
            Self::Rejected { .. } => "rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub family_id: String,
    /// Eggs allocated to the family.
    pub amount: i64,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

impl Delivery {
    pub fn pending(family_id: String, amount: i64) -> Self {
        Self {
            family_id,
            amount,
            status: DeliveryStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, DeliveryStatus::Pending)
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self.status, DeliveryStatus::Delivered { .. })
    }

    fn ensure_pending(&self) -> ResultEngine<()> {
        if !self.is_pending() {
            return Err(EngineError::InvalidTransition(format!(
                "delivery for family '{}' is already {}",
                self.family_id,
                self.status.as_str()
            )));
        }
        Ok(())
    }

    /// `Pending → Delivered`.
    pub fn confirm(&mut self, confirmed_by: &str, at: DateTime<Utc>) -> ResultEngine<()> {
        self.ensure_pending()?;
        self.status = DeliveryStatus::Delivered {
            delivered_at: at,
            confirmed_by: confirmed_by.to_string(),
        };
        Ok(())
    }

    /// `Pending → Rejected`. Returns the cash value frozen into the delivery.
    pub fn reject(
        &mut self,
        rejected_by: &str,
        at: DateTime<Utc>,
        egg_price: MoneyCents,
    ) -> ResultEngine<MoneyCents> {
        self.ensure_pending()?;
        let cash_value = allocation::rejected_cash_value(self.amount, egg_price)?;
        self.status = DeliveryStatus::Rejected {
            rejected_at: at,
            rejected_by: rejected_by.to_string(),
            egg_price,
            cash_value,
        };
        Ok(cash_value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EggRecord {
    pub id: Uuid,
    pub quantity: i64,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub recorded_by: String,
    pub family_count_at_production: i64,
    #[serde(default)]
    pub deliveries: BTreeMap<String, Delivery>,
}

impl EggRecord {
    /// Creates a batch with one pending delivery per family.
    pub fn new(
        quantity: i64,
        note: Option<String>,
        occurred_at: DateTime<Utc>,
        recorded_by: String,
        family_ids: &[String],
    ) -> ResultEngine<Self> {
        if quantity <= 0 {
            return Err(EngineError::InvalidAmount(
                "egg quantity must be > 0".to_string(),
            ));
        }
        let family_count = family_ids.len() as i64;
        let share = allocation::per_family_share(quantity, family_count);
        let deliveries = family_ids
            .iter()
            .map(|id| (id.clone(), Delivery::pending(id.clone(), share)))
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            quantity,
            note,
            occurred_at,
            recorded_by,
            family_count_at_production: family_count,
            deliveries,
        })
    }

    /// Frozen per-family share of this batch.
    pub fn per_family_share(&self) -> i64 {
        allocation::per_family_share(self.quantity, self.family_count_at_production)
    }

    pub fn delivery_mut(&mut self, family_id: &str) -> ResultEngine<&mut Delivery> {
        self.deliveries.get_mut(family_id).ok_or_else(|| {
            EngineError::KeyNotFound(format!("delivery for family '{family_id}' not exists"))
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "eggs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub quantity: i64,
    pub note: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub recorded_by: String,
    pub family_count_at_production: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::egg_deliveries::Entity")]
    Deliveries,
}

impl Related<super::egg_deliveries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deliveries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&EggRecord> for ActiveModel {
    fn from(record: &EggRecord) -> Self {
        Self {
            id: ActiveValue::Set(record.id),
            quantity: ActiveValue::Set(record.quantity),
            note: ActiveValue::Set(record.note.clone()),
            occurred_at: ActiveValue::Set(record.occurred_at),
            recorded_by: ActiveValue::Set(record.recorded_by.clone()),
            family_count_at_production: ActiveValue::Set(record.family_count_at_production),
        }
    }
}

impl TryFrom<(Model, Vec<egg_deliveries::Model>)> for EggRecord {
    type Error = EngineError;

    fn try_from(
        (model, delivery_models): (Model, Vec<egg_deliveries::Model>),
    ) -> Result<Self, Self::Error> {
        let mut deliveries = BTreeMap::new();
        for delivery_model in delivery_models {
            let delivery = Delivery::try_from(delivery_model)?;
            deliveries.insert(delivery.family_id.clone(), delivery);
        }
        Ok(Self {
            id: model.id,
            quantity: model.quantity,
            note: model.note,
            occurred_at: model.occurred_at,
            recorded_by: model.recorded_by,
            family_count_at_production: model.family_count_at_production,
            deliveries,
        })
    }
}
