use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseTransaction, TransactionTrait, prelude::*};
use serde_json::json;
use uuid::Uuid;

use crate::{
    Actor, Collection, EngineError, Investor, InvestorNew, LogEntry, MoneyCents, ResultEngine,
    investors,
    util::{normalize_optional_text, normalize_required_name},
};

use super::{
    Changes, Engine,
    access::{require_admin, require_super_admin},
    audit, load_investors, load_settings, with_tx,
};

pub(super) async fn require_investor(
    db_tx: &DatabaseTransaction,
    investor_id: Uuid,
) -> ResultEngine<Investor> {
    let model = investors::Entity::find_by_id(investor_id)
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("investor {investor_id} not exists")))?;
    Investor::try_from(model)
}

impl Engine {
    /// All investors, ordered by name.
    pub async fn investors(&self) -> ResultEngine<Vec<Investor>> {
        load_investors(&self.database).await
    }

    pub async fn investor(&self, investor_id: Uuid) -> ResultEngine<Investor> {
        with_tx!(self, |db_tx| require_investor(&db_tx, investor_id).await)
    }

    pub async fn create_investor(&self, actor: &Actor, cmd: InvestorNew) -> ResultEngine<Uuid> {
        require_admin(actor, "create investor")?;
        let name = normalize_required_name(&cmd.name, "investor")?;
        let mut investor = Investor::new(name, cmd.initial_capital)?;
        investor.email = normalize_optional_text(cmd.email.as_deref()).map(|e| e.to_lowercase());
        investor.gender = normalize_optional_text(cmd.gender.as_deref());
        investor.role = cmd.role;

        let changes = with_tx!(self, |db_tx| {
            investors::ActiveModel::from(&investor)
                .insert(&db_tx)
                .await?;

            let mut changes = Changes::default();
            changes.created(Collection::Investors, investor.id);
            let log = LogEntry::new(
                "investor",
                format!("Added investor {}", investor.name),
                &actor.email,
                json!({
                    "investorId": investor.id,
                    "initialCapital": investor.initial_capital,
                }),
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok(changes)
        })?;

        tracing::info!(investor_id = %investor.id, "investor created");
        self.publish(changes);
        Ok(investor.id)
    }

    /// Sets both `initial_capital` and `current_capital` to `amount`.
    pub async fn set_capital(
        &self,
        actor: &Actor,
        investor_id: Uuid,
        amount: MoneyCents,
    ) -> ResultEngine<()> {
        require_admin(actor, "set capital")?;
        if amount.is_negative() {
            return Err(EngineError::InvalidAmount(
                "capital must be >= 0".to_string(),
            ));
        }

        let changes = with_tx!(self, |db_tx| {
            let investor = require_investor(&db_tx, investor_id).await?;
            let active = investors::ActiveModel {
                id: ActiveValue::Set(investor_id),
                initial_capital: ActiveValue::Set(amount.cents()),
                current_capital: ActiveValue::Set(amount.cents()),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            let mut changes = Changes::default();
            changes.updated(Collection::Investors, Some(investor_id));
            let log = LogEntry::new(
                "capital",
                format!("Capital of {} set to {amount}", investor.name),
                &actor.email,
                json!({
                    "investorId": investor_id,
                    "previous": investor.initial_capital,
                    "amount": amount,
                }),
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok(changes)
        })?;

        tracing::info!(%investor_id, %amount, "capital set");
        self.publish(changes);
        Ok(())
    }

    /// Removes an investor. Their past transactions stay in the ledger.
    ///
    /// An investor still listed as a family member cannot be removed: the
    /// family has to be saved without them first.
    pub async fn delete_investor(&self, actor: &Actor, investor_id: Uuid) -> ResultEngine<()> {
        require_super_admin(actor, "delete investor")?;

        let changes = with_tx!(self, |db_tx| {
            let investor = require_investor(&db_tx, investor_id).await?;
            let settings = load_settings(&db_tx).await?;
            if let Some(family) = settings
                .families()
                .iter()
                .find(|family| family.investor_ids.contains(&investor_id))
            {
                return Err(EngineError::InvalidPayload(format!(
                    "{} is a member of family '{}'",
                    investor.name, family.id
                )));
            }
            investors::Entity::delete_by_id(investor_id)
                .exec(&db_tx)
                .await?;

            let mut changes = Changes::default();
            changes.deleted(Collection::Investors, investor_id);
            let log = LogEntry::new(
                "investor_delete",
                format!("Removed investor {}", investor.name),
                &actor.email,
                json!({ "investorId": investor_id }),
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok(changes)
        })?;

        tracing::info!(%investor_id, "investor deleted");
        self.publish(changes);
        Ok(())
    }
}
