//! Payment history rows of a debt.

use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{DebtPayment, EngineError, InvestorPayment, MoneyCents, PaymentSource};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "debt_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub debt_id: Uuid,
    pub amount_minor: i64,
    pub source: String,
    /// JSON array of `InvestorPayment`.
    pub investor_payments: String,
    pub note: Option<String>,
    pub paid_at: DateTimeUtc,
    pub recorded_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::debts::Entity",
        from = "Column::DebtId",
        to = "super::debts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Debts,
}

impl Related<super::debts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Debts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<(Uuid, &DebtPayment)> for ActiveModel {
    type Error = EngineError;

    fn try_from((debt_id, payment): (Uuid, &DebtPayment)) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(payment.id),
            debt_id: ActiveValue::Set(debt_id),
            amount_minor: ActiveValue::Set(payment.amount.cents()),
            source: ActiveValue::Set(payment.source.as_str().to_string()),
            investor_payments: ActiveValue::Set(serde_json::to_string(
                &payment.investor_payments,
            )?),
            note: ActiveValue::Set(payment.note.clone()),
            paid_at: ActiveValue::Set(payment.paid_at),
            recorded_by: ActiveValue::Set(payment.recorded_by.clone()),
        })
    }
}

impl TryFrom<Model> for DebtPayment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let investor_payments: Vec<InvestorPayment> =
            serde_json::from_str(&model.investor_payments)?;
        Ok(Self {
            id: model.id,
            amount: MoneyCents::new(model.amount_minor),
            source: PaymentSource::try_from(model.source.as_str())?,
            investor_payments,
            note: model.note,
            paid_at: model.paid_at,
            recorded_by: model.recorded_by,
        })
    }
}
