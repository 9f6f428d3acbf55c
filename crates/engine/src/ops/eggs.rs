use chrono::Utc;
use sea_orm::{ActiveModelTrait, QueryFilter, TransactionTrait, prelude::*};
use serde_json::json;
use uuid::Uuid;

use crate::{
    Actor, Automation, Collection, EggRecord, EggsCmd, EngineError, LogEntry, Notification,
    ResultEngine, Transaction, TransactionDetail, allocation, egg_deliveries, eggs,
    transactions, util::normalize_optional_text,
};

use super::{
    Changes, Engine, access::require_admin, audit, investors::require_investor, load_egg,
    load_eggs, load_settings, with_tx,
};

impl Engine {
    /// All egg batches with their deliveries, oldest first.
    pub async fn eggs(&self) -> ResultEngine<Vec<EggRecord>> {
        load_eggs(&self.database).await
    }

    pub async fn egg(&self, egg_id: Uuid) -> ResultEngine<EggRecord> {
        with_tx!(self, |db_tx| load_egg(&db_tx, egg_id).await)
    }

    /// Records a production batch with one pending delivery per family.
    ///
    /// Any authenticated actor can record eggs. Without an explicit family
    /// list the batch is split among the currently configured families.
    pub async fn add_eggs(&self, actor: &Actor, cmd: EggsCmd) -> ResultEngine<Uuid> {
        if cmd.quantity <= 0 {
            return Err(EngineError::InvalidAmount(
                "egg quantity must be > 0".to_string(),
            ));
        }
        let note = normalize_optional_text(cmd.meta.note.as_deref());

        let (id, changes) = with_tx!(self, |db_tx| {
            let settings = load_settings(&db_tx).await?;
            let family_ids: Vec<String> = match cmd.family_ids {
                Some(ids) => {
                    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
                    for id in ids {
                        if settings.family(&id).is_none() {
                            return Err(EngineError::KeyNotFound(format!(
                                "family '{id}' not exists"
                            )));
                        }
                        if !unique.contains(&id) {
                            unique.push(id);
                        }
                    }
                    unique
                }
                None => settings.families().iter().map(|f| f.id.clone()).collect(),
            };

            let record = EggRecord::new(
                cmd.quantity,
                note,
                cmd.meta.occurred_at,
                actor.email.clone(),
                &family_ids,
            )?;
            eggs::ActiveModel::from(&record).insert(&db_tx).await?;
            let deliveries: Vec<egg_deliveries::ActiveModel> = record
                .deliveries
                .values()
                .map(|delivery| egg_deliveries::ActiveModel::from((record.id, delivery)))
                .collect();
            if !deliveries.is_empty() {
                egg_deliveries::Entity::insert_many(deliveries)
                    .exec(&db_tx)
                    .await?;
            }

            let mut changes = Changes::default();
            changes.created(Collection::Eggs, record.id);
            let log = LogEntry::new(
                "eggs",
                format!("Recorded {} eggs", record.quantity),
                &actor.email,
                json!({
                    "eggId": record.id,
                    "quantity": record.quantity,
                    "familyCount": record.family_count_at_production,
                    "perFamily": record.per_family_share(),
                }),
            );
            let notification = Notification::all_investors(
                "notifications.eggs.title",
                "notifications.eggs.message",
                json!({
                    "quantity": record.quantity,
                    "perFamily": record.per_family_share(),
                }),
            );
            audit::record(&db_tx, &log, Some(&notification), &mut changes).await?;
            Ok((record.id, changes))
        })?;

        tracing::info!(egg_id = %id, quantity = cmd.quantity, "eggs recorded");
        self.publish(changes);
        Ok(id)
    }

    /// `Pending → Delivered` for one family of a batch.
    pub async fn confirm_delivery(
        &self,
        actor: &Actor,
        egg_id: Uuid,
        family_id: &str,
    ) -> ResultEngine<()> {
        require_admin(actor, "confirm delivery")?;

        let changes = with_tx!(self, |db_tx| {
            let mut record = load_egg(&db_tx, egg_id).await?;
            let delivery = record.delivery_mut(family_id)?;
            delivery.confirm(&actor.email, Utc::now())?;
            egg_deliveries::ActiveModel::from((egg_id, &*delivery))
                .update(&db_tx)
                .await?;

            let mut changes = Changes::default();
            changes.updated(Collection::Eggs, Some(egg_id));
            let log = LogEntry::new(
                "delivery_confirmed",
                format!("Delivered {} eggs to {family_id}", delivery.amount),
                &actor.email,
                json!({ "eggId": egg_id, "familyId": family_id, "amount": delivery.amount }),
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok(changes)
        })?;

        tracing::info!(%egg_id, family_id, "delivery confirmed");
        self.publish(changes);
        Ok(())
    }

    /// `Pending → Rejected` for one family of a batch.
    ///
    /// The family's share is converted into cash at the current egg price
    /// and credited to its members as automated contributions, split evenly.
    /// Returns the ids of the generated contributions.
    pub async fn reject_delivery(
        &self,
        actor: &Actor,
        egg_id: Uuid,
        family_id: &str,
    ) -> ResultEngine<Vec<Uuid>> {
        require_admin(actor, "reject delivery")?;

        let (ids, changes) = with_tx!(self, |db_tx| {
            let settings = load_settings(&db_tx).await?;
            let egg_price = settings.egg_price();
            let (family_name, members) = settings
                .family(family_id)
                .map(|family| (family.name.clone(), family.investor_ids.clone()))
                .ok_or_else(|| {
                    EngineError::KeyNotFound(format!("family '{family_id}' not exists"))
                })?;

            let mut record = load_egg(&db_tx, egg_id).await?;
            let now = Utc::now();
            let delivery = record.delivery_mut(family_id)?;
            let share = delivery.amount;
            let cash_value = delivery.reject(&actor.email, now, egg_price)?;
            egg_deliveries::ActiveModel::from((egg_id, &*delivery))
                .update(&db_tx)
                .await?;

            if egg_price.is_zero() {
                tracing::warn!(%egg_id, family_id, "egg price is zero, rejection has no cash value");
            } else if members.is_empty() {
                tracing::warn!(%egg_id, family_id, "family has no members to credit");
            }

            let mut changes = Changes::default();
            changes.updated(Collection::Eggs, Some(egg_id));

            let mut ids = Vec::new();
            let split = if cash_value.is_positive() {
                allocation::split_among_members(cash_value, &members)
            } else {
                Vec::new()
            };
            for (investor_id, amount) in split {
                if !amount.is_positive() {
                    continue;
                }
                let investor = require_investor(&db_tx, investor_id).await?;
                let tx = Transaction::new(
                    TransactionDetail::Contribution {
                        investor_id: investor.id,
                        investor_name: investor.name,
                        automated: Some(Automation {
                            related_egg_id: Some(egg_id),
                            related_family_id: Some(family_id.to_string()),
                            related_debt_id: None,
                        }),
                    },
                    amount,
                    Some(format!(
                        "Rejected eggs: {share} x {egg_price} ({family_name})"
                    )),
                    now,
                    actor.email.clone(),
                )?;
                transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
                changes.created(Collection::Transactions, tx.id);
                ids.push(tx.id);
            }

            let log = LogEntry::new(
                "delivery_rejected",
                format!("{family_name} rejected {share} eggs worth {cash_value}"),
                &actor.email,
                json!({
                    "eggId": egg_id,
                    "familyId": family_id,
                    "share": share,
                    "eggPrice": egg_price,
                    "cashValue": cash_value,
                    "contributions": ids,
                }),
            );
            let notification = Notification::all_investors(
                "notifications.rejection.title",
                "notifications.rejection.message",
                json!({
                    "family": family_name,
                    "share": share,
                    "cashValue": cash_value,
                }),
            );
            audit::record(&db_tx, &log, Some(&notification), &mut changes).await?;
            Ok((ids, changes))
        })?;

        tracing::info!(%egg_id, family_id, contributions = ids.len(), "delivery rejected");
        self.publish(changes);
        Ok(ids)
    }

    /// Hard-deletes a batch and its deliveries. Contributions generated by
    /// earlier rejections stay in the ledger.
    pub async fn delete_egg(&self, actor: &Actor, egg_id: Uuid) -> ResultEngine<()> {
        require_admin(actor, "delete eggs")?;

        let changes = with_tx!(self, |db_tx| {
            let record = load_egg(&db_tx, egg_id).await?;
            egg_deliveries::Entity::delete_many()
                .filter(egg_deliveries::Column::EggId.eq(egg_id))
                .exec(&db_tx)
                .await?;
            eggs::Entity::delete_by_id(egg_id).exec(&db_tx).await?;

            let mut changes = Changes::default();
            changes.deleted(Collection::Eggs, egg_id);
            let log = LogEntry::new(
                "egg_delete",
                format!("Deleted batch of {} eggs", record.quantity),
                &actor.email,
                serde_json::to_value(&record)?,
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok(changes)
        })?;

        tracing::info!(%egg_id, "egg record deleted");
        self.publish(changes);
        Ok(())
    }
}
