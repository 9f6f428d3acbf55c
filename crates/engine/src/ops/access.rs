use sea_orm::{ActiveModelTrait, QueryOrder, TransactionTrait, prelude::*};
use serde_json::json;

use crate::{Actor, Collection, EngineError, LogEntry, ResultEngine, User, investors, users};

use super::{Changes, Engine, audit, with_tx};

/// Fails unless the actor is an admin (super-admins included).
pub(super) fn require_admin(actor: &Actor, action: &str) -> ResultEngine<()> {
    if !actor.is_admin() {
        return Err(EngineError::PermissionDenied(format!(
            "{action} requires an admin"
        )));
    }
    Ok(())
}

pub(super) fn require_super_admin(actor: &Actor, action: &str) -> ResultEngine<()> {
    if !actor.is_super_admin() {
        return Err(EngineError::PermissionDenied(format!(
            "{action} requires a super admin"
        )));
    }
    Ok(())
}

impl Engine {
    /// Checks a login against the identity table.
    ///
    /// Returns `None` when the email is unknown or the password does not match.
    pub async fn authenticate(&self, email: &str, password: &str) -> ResultEngine<Option<Actor>> {
        let email = email.trim().to_lowercase();
        let Some(model) = users::Entity::find_by_id(email).one(&self.database).await? else {
            return Ok(None);
        };
        if model.password != password {
            return Ok(None);
        }
        let user = User::try_from(model)?;
        Ok(Some(Actor::from(&user)))
    }

    /// Maps an email to its actor.
    pub async fn resolve_actor(&self, email: &str) -> ResultEngine<Actor> {
        let email = email.trim().to_lowercase();
        let model = users::Entity::find_by_id(email.clone())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {email} not exists")))?;
        let user = User::try_from(model)?;
        Ok(Actor::from(&user))
    }

    /// Registers a login. Only super-admins can grant access.
    pub async fn create_user(&self, actor: &Actor, user: User) -> ResultEngine<()> {
        require_super_admin(actor, "create user")?;
        let email = user.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(EngineError::InvalidName(
                "user email must not be empty".to_string(),
            ));
        }
        if user.password.is_empty() {
            return Err(EngineError::InvalidName(
                "user password must not be empty".to_string(),
            ));
        }
        let user = User { email, ..user };

        let changes = with_tx!(self, |db_tx| {
            if users::Entity::find_by_id(user.email.clone())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(user.email.clone()));
            }
            if let Some(investor_id) = user.investor_id
                && investors::Entity::find_by_id(investor_id)
                    .one(&db_tx)
                    .await?
                    .is_none()
            {
                return Err(EngineError::KeyNotFound(format!(
                    "investor {investor_id} not exists"
                )));
            }

            users::ActiveModel::from(&user).insert(&db_tx).await?;

            let mut changes = Changes::default();
            changes.updated(Collection::Users, None);
            let log = LogEntry::new(
                "user",
                format!("Granted {} access to {}", user.role.as_str(), user.email),
                &actor.email,
                json!({ "email": user.email, "role": user.role, "investorId": user.investor_id }),
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok(changes)
        })?;

        tracing::info!(email = %user.email, role = user.role.as_str(), "user created");
        self.publish(changes);
        Ok(())
    }

    /// Lists the identity table. Super-admin only, rows carry passwords.
    pub async fn users(&self, actor: &Actor) -> ResultEngine<Vec<User>> {
        require_super_admin(actor, "list users")?;
        users::Entity::find()
            .order_by_asc(users::Column::Email)
            .all(&self.database)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }
}
