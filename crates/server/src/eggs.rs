//! Egg production and delivery endpoints

use api_types::{
    Created,
    egg::{EggsNew, RejectionResult},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Actor, EggRecord};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, to_utc};

pub async fn list(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<EggRecord>>, ServerError> {
    Ok(Json(state.engine.eggs().await?))
}

pub async fn get(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EggRecord>, ServerError> {
    Ok(Json(state.engine.egg(id).await?))
}

/// Any authenticated user may record a batch.
pub async fn eggs_new(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<EggsNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = engine::EggsCmd::new(payload.quantity, to_utc(payload.occurred_at));
    cmd.meta.note = payload.note;
    cmd.family_ids = payload.family_ids;

    let id = state.engine.add_eggs(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn confirm(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path((id, family_id)): Path<(Uuid, String)>,
) -> Result<StatusCode, ServerError> {
    state.engine.confirm_delivery(&actor, id, &family_id).await?;
    Ok(StatusCode::OK)
}

pub async fn reject(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path((id, family_id)): Path<(Uuid, String)>,
) -> Result<Json<RejectionResult>, ServerError> {
    let transaction_ids = state.engine.reject_delivery(&actor, id, &family_id).await?;
    Ok(Json(RejectionResult { transaction_ids }))
}

pub async fn delete(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_egg(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
