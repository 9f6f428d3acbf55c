//! Full-database JSON backup.
//!
//! Export writes every collection. Import is destructive and only restores
//! `investors`, `users`, `transactions` and `eggs`, replacing whatever is
//! stored; the remaining collections in the document are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Debt, EggRecord, Investor, LogEntry, Settings, Transaction, User};

pub const BACKUP_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub investors: Vec<Investor>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub eggs: Vec<EggRecord>,
    #[serde(default)]
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl Backup {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }
}
