//! Ledger transactions.
//!
//! A `Transaction` is an immutable cash event of the shared fund. Its
//! [`TransactionDetail`] decides how it enters the derived totals:
//!
//! - `Expense`: leaves the fund, shared by every capital-holding investor.
//! - `Contribution`: enters the fund, credited to one investor.
//! - `Settlement`: moves cash between one investor and the fund, in the
//!   direction given by [`SettlementType`].

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Expense,
    Contribution,
    Settlement,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Contribution => "contribution",
            Self::Settlement => "settlement",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "expense" => Ok(Self::Expense),
            "contribution" => Ok(Self::Contribution),
            "settlement" => Ok(Self::Settlement),
            other => Err(EngineError::InvalidPayload(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// `Pay`: investor → fund. `Receive`: fund → investor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementType {
    Pay,
    Receive,
}

impl SettlementType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pay => "pay",
            Self::Receive => "receive",
        }
    }
}

impl TryFrom<&str> for SettlementType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pay" => Ok(Self::Pay),
            "receive" => Ok(Self::Receive),
            other => Err(EngineError::InvalidPayload(format!(
                "invalid settlement type: {other}"
            ))),
        }
    }
}

/// Back-references of transactions generated by the engine itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Automation {
    pub related_egg_id: Option<Uuid>,
    pub related_family_id: Option<String>,
    pub related_debt_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionDetail {
    Expense {
        category: String,
    },
    Contribution {
        investor_id: Uuid,
        investor_name: String,
        /// `Some` when generated by a rejection conversion.
        automated: Option<Automation>,
    },
    Settlement {
        investor_id: Uuid,
        investor_name: String,
        settlement_type: SettlementType,
        automated: Option<Automation>,
    },
}

impl TransactionDetail {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::Expense { .. } => TransactionKind::Expense,
            Self::Contribution { .. } => TransactionKind::Contribution,
            Self::Settlement { .. } => TransactionKind::Settlement,
        }
    }

    pub fn investor_id(&self) -> Option<Uuid> {
        match self {
            Self::Expense { .. } => None,
            Self::Contribution { investor_id, .. } | Self::Settlement { investor_id, .. } => {
                Some(*investor_id)
            }
        }
    }

    pub fn automation(&self) -> Option<&Automation> {
        match self {
            Self::Expense { .. } => None,
            Self::Contribution { automated, .. } | Self::Settlement { automated, .. } => {
                automated.as_ref()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub amount: MoneyCents,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(flatten)]
    pub detail: TransactionDetail,
}

impl Transaction {
    pub fn new(
        detail: TransactionDetail,
        amount: MoneyCents,
        note: Option<String>,
        occurred_at: DateTime<Utc>,
        created_by: String,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount("amount must be > 0".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            amount,
            note,
            occurred_at,
            created_by,
            detail,
        })
    }

    pub fn kind(&self) -> TransactionKind {
        self.detail.kind()
    }

    pub fn is_automated(&self) -> bool {
        self.detail.automation().is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: String,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub created_by: String,
    pub category: Option<String>,
    pub investor_id: Option<Uuid>,
    pub investor_name: Option<String>,
    pub settlement_type: Option<String>,
    pub automated: bool,
    pub related_egg_id: Option<Uuid>,
    pub related_family_id: Option<String>,
    pub related_debt_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        let (category, investor_id, investor_name, settlement_type) = match &tx.detail {
            TransactionDetail::Expense { category } => (Some(category.clone()), None, None, None),
            TransactionDetail::Contribution {
                investor_id,
                investor_name,
                ..
            } => (None, Some(*investor_id), Some(investor_name.clone()), None),
            TransactionDetail::Settlement {
                investor_id,
                investor_name,
                settlement_type,
                ..
            } => (
                None,
                Some(*investor_id),
                Some(investor_name.clone()),
                Some(settlement_type.as_str().to_string()),
            ),
        };
        let automation = tx.detail.automation();

        Self {
            id: ActiveValue::Set(tx.id),
            kind: ActiveValue::Set(tx.kind().as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            note: ActiveValue::Set(tx.note.clone()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            category: ActiveValue::Set(category),
            investor_id: ActiveValue::Set(investor_id),
            investor_name: ActiveValue::Set(investor_name),
            settlement_type: ActiveValue::Set(settlement_type),
            automated: ActiveValue::Set(automation.is_some()),
            related_egg_id: ActiveValue::Set(automation.and_then(|a| a.related_egg_id)),
            related_family_id: ActiveValue::Set(
                automation.and_then(|a| a.related_family_id.clone()),
            ),
            related_debt_id: ActiveValue::Set(automation.and_then(|a| a.related_debt_id)),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let kind = TransactionKind::try_from(model.kind.as_str())?;
        let automated = model.automated.then(|| Automation {
            related_egg_id: model.related_egg_id,
            related_family_id: model.related_family_id.clone(),
            related_debt_id: model.related_debt_id,
        });
        let missing_investor =
            || EngineError::InvalidPayload(format!("transaction {} has no investor", model.id));

        let detail = match kind {
            TransactionKind::Expense => TransactionDetail::Expense {
                category: model.category.unwrap_or_default(),
            },
            TransactionKind::Contribution => TransactionDetail::Contribution {
                investor_id: model.investor_id.ok_or_else(missing_investor)?,
                investor_name: model.investor_name.unwrap_or_default(),
                automated,
            },
            TransactionKind::Settlement => TransactionDetail::Settlement {
                investor_id: model.investor_id.ok_or_else(missing_investor)?,
                investor_name: model.investor_name.unwrap_or_default(),
                settlement_type: SettlementType::try_from(
                    model.settlement_type.as_deref().unwrap_or_default(),
                )?,
                automated,
            },
        };

        Ok(Self {
            id: model.id,
            amount: MoneyCents::new(model.amount_minor),
            note: model.note,
            occurred_at: model.occurred_at,
            created_by: model.created_by,
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_non_positive_amounts() {
        let detail = TransactionDetail::Expense {
            category: "feed".to_string(),
        };
        let err = Transaction::new(
            detail.clone(),
            MoneyCents::ZERO,
            None,
            Utc::now(),
            "admin@farm".to_string(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidAmount("amount must be > 0".to_string())
        );
        assert!(
            Transaction::new(
                detail,
                MoneyCents::new(-1),
                None,
                Utc::now(),
                "admin@farm".to_string()
            )
            .is_err()
        );
    }

    #[test]
    fn settlement_survives_storage_mapping() {
        let investor_id = Uuid::new_v4();
        let tx = Transaction::new(
            TransactionDetail::Settlement {
                investor_id,
                investor_name: "Ada".to_string(),
                settlement_type: SettlementType::Receive,
                automated: None,
            },
            MoneyCents::new(10_000),
            Some("withdrawal".to_string()),
            Utc::now(),
            "admin@farm".to_string(),
        )
        .unwrap();

        let active = ActiveModel::from(&tx);
        let model = Model {
            id: tx.id,
            kind: active.kind.unwrap(),
            amount_minor: active.amount_minor.unwrap(),
            note: active.note.unwrap(),
            occurred_at: active.occurred_at.unwrap(),
            created_by: active.created_by.unwrap(),
            category: active.category.unwrap(),
            investor_id: active.investor_id.unwrap(),
            investor_name: active.investor_name.unwrap(),
            settlement_type: active.settlement_type.unwrap(),
            automated: active.automated.unwrap(),
            related_egg_id: active.related_egg_id.unwrap(),
            related_family_id: active.related_family_id.unwrap(),
            related_debt_id: active.related_debt_id.unwrap(),
        };
        assert_eq!(model.settlement_type.as_deref(), Some("receive"));
        assert_eq!(Transaction::try_from(model).unwrap(), tx);
    }
}
