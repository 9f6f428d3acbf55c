//! The module contains the errors the engine can throw.
//!
//! Every variant belongs to one of four families, see [`ErrorKind`]:
//!
//! - [`PermissionDenied`] thrown when the actor lacks the required role.
//! - [`KeyNotFound`] thrown when an investor, transaction, egg record or debt
//!   does not exist.
//! - validation errors ([`InvalidAmount`], [`AmountExceedsRemaining`],
//!   [`SplitMismatch`], ...) thrown before anything is written.
//! - [`Database`] thrown when the backing store fails.
//!
//!  [`PermissionDenied`]: EngineError::PermissionDenied
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`AmountExceedsRemaining`]: EngineError::AmountExceedsRemaining
//!  [`SplitMismatch`]: EngineError::SplitMismatch
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid role: {0}")]
    InvalidRole(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Member count mismatch: {0}")]
    MemberCountMismatch(String),
    #[error("Amount exceeds remaining debt: {0}")]
    AmountExceedsRemaining(String),
    #[error("Split mismatch: {0}")]
    SplitMismatch(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Coarse classification of [`EngineError`] used by callers that only need
/// to know who is at fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    NotFound,
    Validation,
    Persistence,
}

impl EngineError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::KeyNotFound(_) => ErrorKind::NotFound,
            Self::Database(_) => ErrorKind::Persistence,
            Self::ExistingKey(_)
            | Self::InvalidAmount(_)
            | Self::InvalidName(_)
            | Self::InvalidId(_)
            | Self::InvalidRole(_)
            | Self::InvalidCursor(_)
            | Self::InvalidTransition(_)
            | Self::MemberCountMismatch(_)
            | Self::AmountExceedsRemaining(_)
            | Self::SplitMismatch(_)
            | Self::InvalidPayload(_) => ErrorKind::Validation,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidPayload(value.to_string())
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::PermissionDenied(a), Self::PermissionDenied(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidRole(a), Self::InvalidRole(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::MemberCountMismatch(a), Self::MemberCountMismatch(b)) => a == b,
            (Self::AmountExceedsRemaining(a), Self::AmountExceedsRemaining(b)) => a == b,
            (Self::SplitMismatch(a), Self::SplitMismatch(b)) => a == b,
            (Self::InvalidPayload(a), Self::InvalidPayload(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            EngineError::PermissionDenied("x".to_string()).kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            EngineError::KeyNotFound("x".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            EngineError::SplitMismatch("x".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            EngineError::Database(DbErr::Custom("boom".to_string())).kind(),
            ErrorKind::Persistence
        );
    }
}
