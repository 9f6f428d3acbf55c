//! Venture configuration stored as JSON documents in the `settings` table.
//!
//! Two keys exist: `expense_categories` and `family_settings`. They are read
//! by the allocation rules but are not ledger state.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MoneyCents;

pub const EXPENSE_CATEGORIES_KEY: &str = "expense_categories";
pub const FAMILY_SETTINGS_KEY: &str = "family_settings";

/// A group of investors entitled to a share of every egg batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub member_count: usize,
    #[serde(default)]
    pub investor_ids: Vec<Uuid>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseCategories {
    pub list: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilySettings {
    pub list: Vec<Family>,
    /// Price of one egg, used to convert rejected deliveries into cash.
    #[serde(default)]
    pub egg_price: MoneyCents,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub expense_categories: ExpenseCategories,
    pub family_settings: FamilySettings,
}

impl Settings {
    pub fn families(&self) -> &[Family] {
        &self.family_settings.list
    }

    pub fn family(&self, family_id: &str) -> Option<&Family> {
        self.family_settings.list.iter().find(|f| f.id == family_id)
    }

    pub fn egg_price(&self) -> MoneyCents {
        self.family_settings.egg_price
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn active_model(key: &str, value: String) -> ActiveModel {
    ActiveModel {
        key: ActiveValue::Set(key.to_string()),
        value: ActiveValue::Set(value),
    }
}
