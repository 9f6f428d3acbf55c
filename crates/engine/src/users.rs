//! Identity table: maps an external login (email) to an investor and a role.
//!
//! This replaces a hardcoded email → investor map: rows are created by the
//! admin CLI or restored from a backup, and resolved into an [`Actor`] for
//! every request.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Investor,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Investor => "investor",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "investor" => Ok(Self::Investor),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(EngineError::InvalidRole(format!("invalid role: {other}"))),
        }
    }
}

/// The identity performing an operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub uid: String,
    pub email: String,
    pub role: Role,
    pub investor_id: Option<Uuid>,
}

impl Actor {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        let email = email.into();
        Self {
            uid: email.clone(),
            email,
            role,
            investor_id: None,
        }
    }

    #[must_use]
    pub fn investor_id(mut self, investor_id: Uuid) -> Self {
        self.investor_id = Some(investor_id);
        self
    }

    /// Super-admins are admins too.
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::SuperAdmin)
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

/// A row of the identity table, as exported in backups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub investor_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub email: String,
    pub password: String,
    pub role: String,
    pub investor_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        Self {
            email: ActiveValue::Set(user.email.clone()),
            password: ActiveValue::Set(user.password.clone()),
            role: ActiveValue::Set(user.role.as_str().to_string()),
            investor_id: ActiveValue::Set(user.investor_id),
        }
    }
}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            role: Role::try_from(model.role.as_str())?,
            email: model.email,
            password: model.password,
            investor_id: model.investor_id,
        })
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            uid: user.email.clone(),
            email: user.email.clone(),
            role: user.role,
            investor_id: user.investor_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_is_admin() {
        let actor = Actor::new("root@farm", Role::SuperAdmin);
        assert!(actor.is_admin());
        assert!(actor.is_super_admin());

        let actor = Actor::new("ops@farm", Role::Admin);
        assert!(actor.is_admin());
        assert!(!actor.is_super_admin());

        assert!(!Actor::new("someone@farm", Role::Investor).is_admin());
    }

    #[test]
    fn role_round_trips_through_storage_string() {
        for role in [Role::Investor, Role::Admin, Role::SuperAdmin] {
            assert_eq!(Role::try_from(role.as_str()).unwrap(), role);
        }
        assert!(Role::try_from("owner").is_err());
    }
}
