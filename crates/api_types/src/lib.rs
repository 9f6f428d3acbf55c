use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response body of every create endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: Uuid,
}

pub mod investor {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvestorNew {
        pub name: String,
        pub initial_capital_minor: i64,
        pub email: Option<String>,
        pub gender: Option<String>,
    }

    /// Overwrites both initial and current capital.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CapitalUpdate {
        pub amount_minor: i64,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Expense,
        Contribution,
        Settlement,
    }

    /// `pay`: investor → fund, `receive`: fund → investor.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SettlementType {
        Pay,
        Receive,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
        /// Inclusive lower bound.
        pub from: Option<DateTime<FixedOffset>>,
        /// Exclusive upper bound.
        pub to: Option<DateTime<FixedOffset>>,
        pub kinds: Option<Vec<TransactionKind>>,
        pub investor_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub occurred_at: DateTime<FixedOffset>,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub created_by: String,
        pub category: Option<String>,
        pub investor_id: Option<Uuid>,
        pub investor_name: Option<String>,
        pub settlement_type: Option<SettlementType>,
        /// Generated by an egg rejection or a debt payment.
        pub automated: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub amount_minor: i64,
        pub category: String,
        pub note: Option<String>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContributionNew {
        pub investor_id: Uuid,
        pub amount_minor: i64,
        pub note: Option<String>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementNew {
        pub investor_id: Uuid,
        pub amount_minor: i64,
        pub settlement_type: SettlementType,
        pub note: Option<String>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }

    /// Every field is optional; absent fields keep their stored value and an
    /// empty `note` clears it.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub amount_minor: Option<i64>,
        pub note: Option<String>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
        pub category: Option<String>,
        pub investor_id: Option<Uuid>,
    }
}

pub mod egg {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EggsNew {
        pub quantity: i64,
        pub note: Option<String>,
        pub occurred_at: DateTime<FixedOffset>,
        /// Families receiving the batch, all configured families when absent.
        pub family_ids: Option<Vec<String>>,
    }

    /// Contributions credited by a rejection, one per family member.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RejectionResult {
        pub transaction_ids: Vec<Uuid>,
    }
}

pub mod debt {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentSource {
        Fund,
        Investors,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtNew {
        pub creditor_name: String,
        pub total_minor: i64,
        #[serde(default)]
        pub deduct_from_fund: bool,
        pub note: Option<String>,
        pub occurred_at: DateTime<FixedOffset>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct InvestorShare {
        pub investor_id: Uuid,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtPaymentNew {
        pub amount_minor: i64,
        pub source: PaymentSource,
        /// Required when `source` is `investors`; must add up to `amount_minor`.
        #[serde(default)]
        pub investor_payments: Vec<InvestorShare>,
        pub note: Option<String>,
        pub paid_at: DateTime<FixedOffset>,
    }
}

pub mod settings {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoriesUpdate {
        pub categories: Vec<String>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct FamilyInput {
        pub id: String,
        pub name: String,
        #[serde(default)]
        pub icon: String,
        pub member_count: usize,
        #[serde(default)]
        pub investor_ids: Vec<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FamiliesUpdate {
        pub families: Vec<FamilyInput>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EggPriceUpdate {
        pub egg_price_minor: i64,
    }
}

pub mod audit {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AuditQuery {
        /// Defaults to 50.
        pub limit: Option<u64>,
    }
}
