//! Outbox of "notify every investor" side effects.
//!
//! The engine only records what should be announced (translation keys and
//! parameters); delivering it is someone else's job.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub title_key: String,
    pub message_key: String,
    pub params: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn all_investors(title_key: &str, message_key: &str, params: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            title_key: title_key.to_string(),
            message_key: message_key.to_string(),
            params,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title_key: String,
    pub message_key: String,
    pub params: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Notification> for ActiveModel {
    fn from(notification: &Notification) -> Self {
        Self {
            id: ActiveValue::Set(notification.id),
            title_key: ActiveValue::Set(notification.title_key.clone()),
            message_key: ActiveValue::Set(notification.message_key.clone()),
            params: ActiveValue::Set(notification.params.to_string()),
            created_at: ActiveValue::Set(notification.created_at),
        }
    }
}

impl TryFrom<Model> for Notification {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            title_key: model.title_key,
            message_key: model.message_key,
            params: serde_json::from_str(&model.params)?,
            created_at: model.created_at,
        })
    }
}
