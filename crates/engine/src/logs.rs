//! Audit log of every orchestrated write.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub user: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(
        kind: &str,
        message: impl Into<String>,
        user: &str,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            message: message.into(),
            user: user.to_string(),
            details,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: String,
    pub message: String,
    pub user: String,
    pub details: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LogEntry> for ActiveModel {
    fn from(entry: &LogEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id),
            kind: ActiveValue::Set(entry.kind.clone()),
            message: ActiveValue::Set(entry.message.clone()),
            user: ActiveValue::Set(entry.user.clone()),
            details: ActiveValue::Set(entry.details.to_string()),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for LogEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            kind: model.kind,
            message: model.message,
            user: model.user,
            details: serde_json::from_str(&model.details)?,
            created_at: model.created_at,
        })
    }
}
