//! Investors of the venture.
//!
//! `initial_capital` defines the ownership share and enters the balance
//! derivation. `current_capital` is stored alongside it and kept in sync by
//! "set capital", but nothing reads it.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, Role};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investor {
    pub id: Uuid,
    pub name: String,
    pub initial_capital: MoneyCents,
    pub current_capital: MoneyCents,
    pub email: Option<String>,
    pub role: Role,
    pub gender: Option<String>,
}

impl Investor {
    pub fn new(name: String, initial_capital: MoneyCents) -> ResultEngine<Self> {
        if initial_capital.is_negative() {
            return Err(EngineError::InvalidAmount(
                "capital must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            initial_capital,
            current_capital: initial_capital,
            email: None,
            role: Role::Investor,
            gender: None,
        })
    }

    /// Investors holding capital take part in the expense split.
    pub fn is_active(&self) -> bool {
        self.initial_capital.is_positive()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "investors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub initial_capital: i64,
    pub current_capital: i64,
    pub email: Option<String>,
    pub role: String,
    pub gender: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Investor> for ActiveModel {
    fn from(investor: &Investor) -> Self {
        Self {
            id: ActiveValue::Set(investor.id),
            name: ActiveValue::Set(investor.name.clone()),
            initial_capital: ActiveValue::Set(investor.initial_capital.cents()),
            current_capital: ActiveValue::Set(investor.current_capital.cents()),
            email: ActiveValue::Set(investor.email.clone()),
            role: ActiveValue::Set(investor.role.as_str().to_string()),
            gender: ActiveValue::Set(investor.gender.clone()),
        }
    }
}

impl TryFrom<Model> for Investor {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            initial_capital: MoneyCents::new(model.initial_capital),
            current_capital: MoneyCents::new(model.current_capital),
            email: model.email,
            role: Role::try_from(model.role.as_str())?,
            gender: model.gender,
        })
    }
}
