//! Derived ledger figures and the caller's identity.

use axum::{Extension, Json, extract::State};
use engine::{Actor, LedgerSnapshot};

use crate::{ServerError, server::ServerState};

/// Fund balance, shares, balances and family stats recomputed from history.
pub async fn get(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<LedgerSnapshot>, ServerError> {
    Ok(Json(state.engine.snapshot().await?))
}

pub async fn me(Extension(actor): Extension<Actor>) -> Json<Actor> {
    Json(actor)
}
