use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, FixedOffset, Utc};
use engine::EngineError;

use serde::Serialize;
pub use server::{app, run, run_with_listener, spawn_with_listener};

mod audit;
mod debts;
mod eggs;
mod investors;
mod server;
mod settings;
mod summary;
mod transactions;

pub mod types {
    pub use api_types::Created;

    pub mod investor {
        pub use api_types::investor::{CapitalUpdate, InvestorNew};
        pub use engine::Investor;
    }

    pub mod transaction {
        pub use api_types::transaction::{
            ContributionNew, ExpenseNew, SettlementNew, SettlementType, TransactionKind,
            TransactionList, TransactionListResponse, TransactionUpdate, TransactionView,
        };
    }

    pub mod egg {
        pub use api_types::egg::{EggsNew, RejectionResult};
        pub use engine::{Delivery, DeliveryStatus, EggRecord};
    }

    pub mod debt {
        pub use api_types::debt::{DebtNew, DebtPaymentNew, InvestorShare, PaymentSource};
        pub use engine::{Debt, DebtPayment, DebtStatus};
    }

    pub mod settings {
        pub use api_types::settings::{
            CategoriesUpdate, EggPriceUpdate, FamiliesUpdate, FamilyInput,
        };
        pub use engine::Settings;
    }

    pub mod summary {
        pub use engine::{FamilyAllocation, InvestorSummary, LedgerSnapshot};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidName(_)
        | EngineError::InvalidId(_)
        | EngineError::InvalidRole(_)
        | EngineError::InvalidCursor(_)
        | EngineError::InvalidTransition(_)
        | EngineError::MemberCountMismatch(_)
        | EngineError::AmountExceedsRemaining(_)
        | EngineError::SplitMismatch(_)
        | EngineError::InvalidPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

/// Request timestamps carry the caller's offset; the engine stores UTC.
fn to_utc(value: DateTime<FixedOffset>) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn from_utc(value: DateTime<Utc>) -> DateTime<FixedOffset> {
    value.fixed_offset()
}
