use chrono::Utc;
use sea_orm::{ActiveModelTrait, QueryOrder, TransactionTrait, prelude::*};
use serde_json::json;

use crate::{
    Actor, BACKUP_VERSION, Backup, Collection, EngineError, LogEntry, ResultEngine, User,
    egg_deliveries, eggs, investors, logs, transactions, users,
};

use super::{
    Changes, Engine, access::require_super_admin, audit, load_debts, load_eggs, load_investors,
    load_settings, load_transactions, with_tx,
};

impl Engine {
    /// Serializes every collection into one document.
    pub async fn export_backup(&self, actor: &Actor) -> ResultEngine<Backup> {
        require_super_admin(actor, "export backup")?;

        with_tx!(self, |db_tx| {
            let users = users::Entity::find()
                .order_by_asc(users::Column::Email)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(User::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            let logs = logs::Entity::find()
                .order_by_asc(logs::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(LogEntry::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            Ok(Backup {
                version: BACKUP_VERSION,
                exported_at: Utc::now(),
                investors: load_investors(&db_tx).await?,
                users,
                transactions: load_transactions(&db_tx).await?,
                eggs: load_eggs(&db_tx).await?,
                debts: load_debts(&db_tx).await?,
                settings: load_settings(&db_tx).await?,
                logs,
            })
        })
    }

    /// Replaces investors, users, transactions and eggs with the content of
    /// a backup. Destructive; the other collections are left untouched.
    pub async fn import_backup(&self, actor: &Actor, backup: Backup) -> ResultEngine<()> {
        require_super_admin(actor, "import backup")?;
        if backup.version > BACKUP_VERSION {
            return Err(EngineError::InvalidPayload(format!(
                "unsupported backup version {}",
                backup.version
            )));
        }

        let changes = with_tx!(self, |db_tx| {
            egg_deliveries::Entity::delete_many().exec(&db_tx).await?;
            eggs::Entity::delete_many().exec(&db_tx).await?;
            transactions::Entity::delete_many().exec(&db_tx).await?;
            users::Entity::delete_many().exec(&db_tx).await?;
            investors::Entity::delete_many().exec(&db_tx).await?;

            for investor in &backup.investors {
                investors::ActiveModel::from(investor).insert(&db_tx).await?;
            }
            for user in &backup.users {
                users::ActiveModel::from(user).insert(&db_tx).await?;
            }
            for tx in &backup.transactions {
                transactions::ActiveModel::from(tx).insert(&db_tx).await?;
            }
            for record in &backup.eggs {
                eggs::ActiveModel::from(record).insert(&db_tx).await?;
                for delivery in record.deliveries.values() {
                    egg_deliveries::ActiveModel::from((record.id, delivery))
                        .insert(&db_tx)
                        .await?;
                }
            }

            let mut changes = Changes::default();
            for collection in [
                Collection::Investors,
                Collection::Users,
                Collection::Transactions,
                Collection::Eggs,
            ] {
                changes.replaced(collection);
            }
            let log = LogEntry::new(
                "backup_import",
                "Restored backup",
                &actor.email,
                json!({
                    "exportedAt": backup.exported_at,
                    "investors": backup.investors.len(),
                    "users": backup.users.len(),
                    "transactions": backup.transactions.len(),
                    "eggs": backup.eggs.len(),
                }),
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok(changes)
        })?;

        tracing::info!(
            investors = backup.investors.len(),
            transactions = backup.transactions.len(),
            "backup imported"
        );
        self.publish(changes);
        Ok(())
    }
}
