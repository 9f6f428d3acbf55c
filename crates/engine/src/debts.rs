//! Debt subledger: obligations towards third-party creditors.
//!
//! Invariant: `paid_amount + remaining_amount == total_amount`, and the
//! status is derived from `remaining_amount` after every payment.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, debt_payments};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Pending,
    Partial,
    Paid,
}

impl DebtStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }

    /// `0 → Paid`, `0 < remaining < total → Partial`, otherwise `Pending`.
    pub fn derive(total: MoneyCents, remaining: MoneyCents) -> Self {
        if remaining.is_zero() {
            Self::Paid
        } else if remaining < total {
            Self::Partial
        } else {
            Self::Pending
        }
    }
}

impl TryFrom<&str> for DebtStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            other => Err(EngineError::InvalidPayload(format!(
                "invalid debt status: {other}"
            ))),
        }
    }
}

/// Who covers a debt payment when it is deducted from the fund.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSource {
    /// Shared by every investor through one fund expense.
    Fund,
    /// Charged to the investors listed in the payment split.
    Investors,
}

impl PaymentSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fund => "fund",
            Self::Investors => "investors",
        }
    }
}

impl TryFrom<&str> for PaymentSource {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "fund" => Ok(Self::Fund),
            "investors" => Ok(Self::Investors),
            other => Err(EngineError::InvalidPayload(format!(
                "invalid payment source: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorPayment {
    pub investor_id: Uuid,
    pub amount: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtPayment {
    pub id: Uuid,
    pub amount: MoneyCents,
    pub source: PaymentSource,
    #[serde(default)]
    pub investor_payments: Vec<InvestorPayment>,
    pub note: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub recorded_by: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub id: Uuid,
    pub creditor_name: String,
    pub total_amount: MoneyCents,
    pub paid_amount: MoneyCents,
    pub remaining_amount: MoneyCents,
    pub status: DebtStatus,
    pub occurred_at: DateTime<Utc>,
    pub deduct_from_fund: bool,
    pub note: Option<String>,
    #[serde(default)]
    pub payments: Vec<DebtPayment>,
}

impl Debt {
    pub fn new(
        creditor_name: String,
        total_amount: MoneyCents,
        deduct_from_fund: bool,
        note: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if !total_amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "debt total must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            creditor_name,
            total_amount,
            paid_amount: MoneyCents::ZERO,
            remaining_amount: total_amount,
            status: DebtStatus::Pending,
            occurred_at,
            deduct_from_fund,
            note,
            payments: Vec::new(),
        })
    }

    /// Validates and applies a payment amount, keeping the invariant.
    pub fn apply_payment(&mut self, amount: MoneyCents) -> ResultEngine<()> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "payment must be > 0".to_string(),
            ));
        }
        if amount > self.remaining_amount {
            return Err(EngineError::AmountExceedsRemaining(format!(
                "payment {amount} exceeds remaining {}",
                self.remaining_amount
            )));
        }
        self.remaining_amount -= amount;
        self.paid_amount += amount;
        self.status = DebtStatus::derive(self.total_amount, self.remaining_amount);
        Ok(())
    }
}

/// Validates the per-investor split of a payment charged to investors.
pub(crate) fn validate_split(
    amount: MoneyCents,
    investor_payments: &[InvestorPayment],
) -> ResultEngine<()> {
    if investor_payments.is_empty() {
        return Err(EngineError::SplitMismatch(
            "at least one investor payment is required".to_string(),
        ));
    }
    if investor_payments.iter().any(|p| !p.amount.is_positive()) {
        return Err(EngineError::InvalidAmount(
            "investor payments must be > 0".to_string(),
        ));
    }
    let total: MoneyCents = investor_payments.iter().map(|p| p.amount).sum();
    if total != amount {
        return Err(EngineError::SplitMismatch(format!(
            "investor payments sum to {total}, expected {amount}"
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "debts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub creditor_name: String,
    pub total_amount: i64,
    pub paid_amount: i64,
    pub remaining_amount: i64,
    pub status: String,
    pub occurred_at: DateTimeUtc,
    pub deduct_from_fund: bool,
    pub note: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::debt_payments::Entity")]
    Payments,
}

impl Related<super::debt_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Debt> for ActiveModel {
    fn from(debt: &Debt) -> Self {
        Self {
            id: ActiveValue::Set(debt.id),
            creditor_name: ActiveValue::Set(debt.creditor_name.clone()),
            total_amount: ActiveValue::Set(debt.total_amount.cents()),
            paid_amount: ActiveValue::Set(debt.paid_amount.cents()),
            remaining_amount: ActiveValue::Set(debt.remaining_amount.cents()),
            status: ActiveValue::Set(debt.status.as_str().to_string()),
            occurred_at: ActiveValue::Set(debt.occurred_at),
            deduct_from_fund: ActiveValue::Set(debt.deduct_from_fund),
            note: ActiveValue::Set(debt.note.clone()),
        }
    }
}

impl TryFrom<(Model, Vec<debt_payments::Model>)> for Debt {
    type Error = EngineError;

    fn try_from(
        (model, payment_models): (Model, Vec<debt_payments::Model>),
    ) -> Result<Self, Self::Error> {
        let payments = payment_models
            .into_iter()
            .map(DebtPayment::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        Ok(Self {
            id: model.id,
            creditor_name: model.creditor_name,
            total_amount: MoneyCents::new(model.total_amount),
            paid_amount: MoneyCents::new(model.paid_amount),
            remaining_amount: MoneyCents::new(model.remaining_amount),
            status: DebtStatus::try_from(model.status.as_str())?,
            occurred_at: model.occurred_at,
            deduct_from_fund: model.deduct_from_fund,
            note: model.note,
            payments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debt(total: i64) -> Debt {
        Debt::new(
            "Feed store".to_string(),
            MoneyCents::new(total),
            false,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    fn assert_invariant(debt: &Debt) {
        assert_eq!(debt.paid_amount + debt.remaining_amount, debt.total_amount);
        assert_eq!(
            debt.status == DebtStatus::Paid,
            debt.remaining_amount.is_zero()
        );
    }

    #[test]
    fn payments_walk_pending_partial_paid() {
        let mut debt = debt(10_000);
        assert_eq!(debt.status, DebtStatus::Pending);
        assert_invariant(&debt);

        debt.apply_payment(MoneyCents::new(4_000)).unwrap();
        assert_eq!(debt.status, DebtStatus::Partial);
        assert_eq!(debt.remaining_amount, MoneyCents::new(6_000));
        assert_invariant(&debt);

        debt.apply_payment(MoneyCents::new(6_000)).unwrap();
        assert_eq!(debt.status, DebtStatus::Paid);
        assert_invariant(&debt);
    }

    #[test]
    fn overpayment_is_rejected_without_changes() {
        let mut debt = debt(10_000);
        debt.apply_payment(MoneyCents::new(9_000)).unwrap();

        let err = debt.apply_payment(MoneyCents::new(1_001)).unwrap_err();
        assert!(matches!(err, EngineError::AmountExceedsRemaining(_)));
        assert_eq!(debt.remaining_amount, MoneyCents::new(1_000));
        assert_invariant(&debt);

        assert!(matches!(
            debt.apply_payment(MoneyCents::ZERO),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn split_must_match_amount() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let split = vec![
            InvestorPayment {
                investor_id: a,
                amount: MoneyCents::new(3_000),
            },
            InvestorPayment {
                investor_id: b,
                amount: MoneyCents::new(2_000),
            },
        ];
        validate_split(MoneyCents::new(5_000), &split).unwrap();
        assert!(matches!(
            validate_split(MoneyCents::new(6_000), &split),
            Err(EngineError::SplitMismatch(_))
        ));
        assert!(matches!(
            validate_split(MoneyCents::new(6_000), &[]),
            Err(EngineError::SplitMismatch(_))
        ));
    }
}
