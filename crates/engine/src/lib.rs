//! Ledger engine of a shared farm venture.
//!
//! The engine stores immutable financial events (capital, expenses,
//! contributions, settlements), egg production batches with their per-family
//! deliveries, and debts towards third parties. Nothing derived is persisted:
//! fund balance, ownership shares and investor balances are recomputed by
//! [`LedgerSnapshot::compute`] from the full history.
//!
//! Write operations live on [`Engine`]; each one checks the actor's role,
//! validates its input, and commits all of its writes (including generated
//! transactions, audit log and notifications) in a single database
//! transaction.

pub use allocation::{
    family_egg_share, per_family_share, rejected_cash_value, selectable_investors,
    split_among_members, validate_families,
};
pub use backup::{BACKUP_VERSION, Backup};
pub use commands::{
    ContributionCmd, DebtNew, DebtPaymentCmd, EggsCmd, ExpenseCmd, InvestorNew, SettleCmd, TxMeta,
    TransactionUpdate,
};
pub use debts::{Debt, DebtPayment, DebtStatus, InvestorPayment, PaymentSource};
pub use eggs::{Delivery, DeliveryStatus, EggRecord};
pub use error::{EngineError, ErrorKind};
pub use events::{ChangeEvent, ChangeKind, Collection, Subscription};
pub use investors::Investor;
pub use ledger::{FamilyAllocation, InvestorSummary, LedgerSnapshot};
pub use logs::LogEntry;
pub use money::MoneyCents;
pub use notifications::Notification;
pub use ops::{Engine, EngineBuilder, TransactionListFilter};
pub use settings::{ExpenseCategories, Family, FamilySettings, Settings};
pub use transactions::{
    Automation, SettlementType, Transaction, TransactionDetail, TransactionKind,
};
pub use users::{Actor, Role, User};

pub mod allocation;
mod backup;
mod commands;
mod debt_payments;
mod debts;
mod egg_deliveries;
mod eggs;
mod error;
mod events;
mod investors;
pub mod ledger;
mod logs;
mod money;
mod notifications;
mod ops;
mod settings;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
