//! Command structs for engine operations.
//!
//! These types group parameters for write operations (expenses,
//! contributions, settlements, egg batches, debts), keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{InvestorPayment, MoneyCents, PaymentSource, Role, SettlementType};

/// Common metadata for transaction creation.
#[derive(Clone, Debug)]
pub struct TxMeta {
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TxMeta {
    #[must_use]
    pub fn new(occurred_at: DateTime<Utc>) -> Self {
        Self {
            note: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Create a shared expense.
#[derive(Clone, Debug)]
pub struct ExpenseCmd {
    pub amount: MoneyCents,
    pub category: String,
    pub meta: TxMeta,
}

impl ExpenseCmd {
    #[must_use]
    pub fn new(
        amount: MoneyCents,
        category: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            amount,
            category: category.into(),
            meta: TxMeta::new(occurred_at),
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.meta.note = Some(note.into());
        self
    }
}

/// Credit a contribution to one investor.
#[derive(Clone, Debug)]
pub struct ContributionCmd {
    pub investor_id: Uuid,
    pub amount: MoneyCents,
    pub meta: TxMeta,
}

impl ContributionCmd {
    #[must_use]
    pub fn new(investor_id: Uuid, amount: MoneyCents, occurred_at: DateTime<Utc>) -> Self {
        Self {
            investor_id,
            amount,
            meta: TxMeta::new(occurred_at),
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.meta.note = Some(note.into());
        self
    }
}

/// Move cash between one investor and the fund.
#[derive(Clone, Debug)]
pub struct SettleCmd {
    pub investor_id: Uuid,
    pub amount: MoneyCents,
    pub settlement_type: SettlementType,
    pub meta: TxMeta,
}

impl SettleCmd {
    #[must_use]
    pub fn new(
        investor_id: Uuid,
        amount: MoneyCents,
        settlement_type: SettlementType,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            investor_id,
            amount,
            settlement_type,
            meta: TxMeta::new(occurred_at),
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.meta.note = Some(note.into());
        self
    }
}

/// Fields of an existing transaction to overwrite.
///
/// `category` only applies to expenses and `investor_id` only to
/// contributions and settlements; the kind never changes.
#[derive(Clone, Debug, Default)]
pub struct TransactionUpdate {
    pub amount: Option<MoneyCents>,
    pub note: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub investor_id: Option<Uuid>,
}

impl TransactionUpdate {
    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn investor_id(mut self, investor_id: Uuid) -> Self {
        self.investor_id = Some(investor_id);
        self
    }
}

/// Record an egg production batch.
#[derive(Clone, Debug)]
pub struct EggsCmd {
    pub quantity: i64,
    pub meta: TxMeta,
    /// Families receiving the batch. Defaults to the configured family list.
    pub family_ids: Option<Vec<String>>,
}

impl EggsCmd {
    #[must_use]
    pub fn new(quantity: i64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            quantity,
            meta: TxMeta::new(occurred_at),
            family_ids: None,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.meta.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn families(mut self, family_ids: Vec<String>) -> Self {
        self.family_ids = Some(family_ids);
        self
    }
}

/// Register a new investor.
#[derive(Clone, Debug)]
pub struct InvestorNew {
    pub name: String,
    pub initial_capital: MoneyCents,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub role: Role,
}

impl InvestorNew {
    #[must_use]
    pub fn new(name: impl Into<String>, initial_capital: MoneyCents) -> Self {
        Self {
            name: name.into(),
            initial_capital,
            email: None,
            gender: None,
            role: Role::Investor,
        }
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// Register an obligation towards a creditor.
#[derive(Clone, Debug)]
pub struct DebtNew {
    pub creditor_name: String,
    pub total_amount: MoneyCents,
    pub deduct_from_fund: bool,
    pub meta: TxMeta,
}

impl DebtNew {
    #[must_use]
    pub fn new(
        creditor_name: impl Into<String>,
        total_amount: MoneyCents,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            creditor_name: creditor_name.into(),
            total_amount,
            deduct_from_fund: false,
            meta: TxMeta::new(occurred_at),
        }
    }

    #[must_use]
    pub fn deduct_from_fund(mut self, deduct: bool) -> Self {
        self.deduct_from_fund = deduct;
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.meta.note = Some(note.into());
        self
    }
}

/// Pay (part of) a debt.
#[derive(Clone, Debug)]
pub struct DebtPaymentCmd {
    pub debt_id: Uuid,
    pub amount: MoneyCents,
    pub source: PaymentSource,
    pub investor_payments: Vec<InvestorPayment>,
    pub meta: TxMeta,
}

impl DebtPaymentCmd {
    /// A payment covered by the shared fund.
    #[must_use]
    pub fn from_fund(debt_id: Uuid, amount: MoneyCents, paid_at: DateTime<Utc>) -> Self {
        Self {
            debt_id,
            amount,
            source: PaymentSource::Fund,
            investor_payments: Vec::new(),
            meta: TxMeta::new(paid_at),
        }
    }

    /// A payment split across the given investors.
    #[must_use]
    pub fn from_investors(
        debt_id: Uuid,
        amount: MoneyCents,
        investor_payments: Vec<InvestorPayment>,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            debt_id,
            amount,
            source: PaymentSource::Investors,
            investor_payments,
            meta: TxMeta::new(paid_at),
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.meta.note = Some(note.into());
        self
    }
}
