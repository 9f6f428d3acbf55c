use sea_orm::{ActiveModelTrait, DatabaseTransaction, QueryOrder, QuerySelect, prelude::*};

use crate::{Collection, LogEntry, Notification, ResultEngine, logs, notifications};

use super::{Changes, Engine};

/// Appends the audit row (and the optional investor notification) of an
/// operation to the running DB transaction.
pub(super) async fn record(
    db_tx: &DatabaseTransaction,
    log: &LogEntry,
    notification: Option<&Notification>,
    changes: &mut Changes,
) -> ResultEngine<()> {
    logs::ActiveModel::from(log).insert(db_tx).await?;
    changes.created(Collection::Logs, log.id);
    if let Some(notification) = notification {
        notifications::ActiveModel::from(notification)
            .insert(db_tx)
            .await?;
        changes.created(Collection::Notifications, notification.id);
    }
    Ok(())
}

impl Engine {
    /// Most recent audit entries first.
    pub async fn logs(&self, limit: u64) -> ResultEngine<Vec<LogEntry>> {
        logs::Entity::find()
            .order_by_desc(logs::Column::CreatedAt)
            .limit(limit)
            .all(&self.database)
            .await?
            .into_iter()
            .map(LogEntry::try_from)
            .collect()
    }

    /// Most recent notifications first.
    pub async fn notifications(&self, limit: u64) -> ResultEngine<Vec<Notification>> {
        notifications::Entity::find()
            .order_by_desc(notifications::Column::CreatedAt)
            .limit(limit)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Notification::try_from)
            .collect()
    }
}
