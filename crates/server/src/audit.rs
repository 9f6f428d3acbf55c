//! Audit log and notification feeds

use api_types::audit::AuditQuery;
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::{Actor, LogEntry, Notification};

use crate::{ServerError, server::ServerState};

const DEFAULT_LIMIT: u64 = 50;

pub async fn logs(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<LogEntry>>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.engine.logs(limit).await?))
}

pub async fn notifications(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<Notification>>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.engine.notifications(limit).await?))
}
