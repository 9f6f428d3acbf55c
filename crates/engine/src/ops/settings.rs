use std::collections::HashSet;

use sea_orm::{DatabaseTransaction, TransactionTrait, prelude::*, sea_query::OnConflict};
use serde::Serialize;
use serde_json::json;

use crate::{
    Actor, Collection, EngineError, ExpenseCategories, Family, FamilySettings, LogEntry, MoneyCents,
    ResultEngine, Settings, allocation, settings,
    util::{category_key, normalize_category_display, normalize_required_name},
};

use super::{Changes, Engine, access::require_admin, audit, load_investors, load_settings, with_tx};

async fn store<T: Serialize>(db_tx: &DatabaseTransaction, key: &str, value: &T) -> ResultEngine<()> {
    let active = settings::active_model(key, serde_json::to_string(value)?);
    settings::Entity::insert(active)
        .on_conflict(
            OnConflict::column(settings::Column::Key)
                .update_column(settings::Column::Value)
                .to_owned(),
        )
        .exec(db_tx)
        .await?;
    Ok(())
}

impl Engine {
    pub async fn settings(&self) -> ResultEngine<Settings> {
        load_settings(&self.database).await
    }

    /// Replaces the expense category list.
    ///
    /// Entries are trimmed and de-duplicated ignoring case and accents; the
    /// first spelling wins.
    pub async fn set_expense_categories(
        &self,
        actor: &Actor,
        categories: Vec<String>,
    ) -> ResultEngine<ExpenseCategories> {
        require_admin(actor, "edit expense categories")?;
        let mut seen = HashSet::new();
        let mut list = Vec::with_capacity(categories.len());
        for category in &categories {
            let display = normalize_category_display(category)?;
            if seen.insert(category_key(&display)) {
                list.push(display);
            }
        }
        let value = ExpenseCategories { list };

        let changes = with_tx!(self, |db_tx| {
            store(&db_tx, settings::EXPENSE_CATEGORIES_KEY, &value).await?;

            let mut changes = Changes::default();
            changes.updated(Collection::Settings, None);
            let log = LogEntry::new(
                "settings",
                "Updated expense categories",
                &actor.email,
                json!({ "categories": value.list }),
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok(changes)
        })?;

        tracing::info!(count = value.list.len(), "expense categories updated");
        self.publish(changes);
        Ok(value)
    }

    /// Replaces the family list, keeping the egg price.
    pub async fn save_families(
        &self,
        actor: &Actor,
        families: Vec<Family>,
    ) -> ResultEngine<FamilySettings> {
        require_admin(actor, "edit families")?;
        let families = families
            .into_iter()
            .map(|family| {
                Ok(Family {
                    id: family.id.trim().to_string(),
                    name: normalize_required_name(&family.name, "family")?,
                    icon: family.icon.trim().to_string(),
                    ..family
                })
            })
            .collect::<ResultEngine<Vec<_>>>()?;

        let (value, changes) = with_tx!(self, |db_tx| {
            let investors = load_investors(&db_tx).await?;
            allocation::validate_families(&families, &investors)?;
            let current = load_settings(&db_tx).await?;
            let value = FamilySettings {
                list: families,
                egg_price: current.egg_price(),
            };
            store(&db_tx, settings::FAMILY_SETTINGS_KEY, &value).await?;

            let mut changes = Changes::default();
            changes.updated(Collection::Settings, None);
            let log = LogEntry::new(
                "settings",
                "Updated families",
                &actor.email,
                json!({ "families": value.list }),
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok((value, changes))
        })?;

        tracing::info!(count = value.list.len(), "families updated");
        self.publish(changes);
        Ok(value)
    }

    /// Sets the price of one egg used for future rejections.
    pub async fn set_egg_price(&self, actor: &Actor, price: MoneyCents) -> ResultEngine<()> {
        require_admin(actor, "set egg price")?;
        if price.is_negative() {
            return Err(EngineError::InvalidAmount(
                "egg price must be >= 0".to_string(),
            ));
        }

        let changes = with_tx!(self, |db_tx| {
            let current = load_settings(&db_tx).await?;
            let previous = current.egg_price();
            let value = FamilySettings {
                egg_price: price,
                ..current.family_settings
            };
            store(&db_tx, settings::FAMILY_SETTINGS_KEY, &value).await?;

            let mut changes = Changes::default();
            changes.updated(Collection::Settings, None);
            let log = LogEntry::new(
                "settings",
                format!("Egg price set to {price}"),
                &actor.email,
                json!({ "previous": previous, "eggPrice": price }),
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok(changes)
        })?;

        tracing::info!(%price, "egg price updated");
        self.publish(changes);
        Ok(())
    }
}
