//! Investors API endpoints

use api_types::{
    Created,
    investor::{CapitalUpdate, InvestorNew},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Actor, Investor, MoneyCents};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub async fn list(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<Investor>>, ServerError> {
    Ok(Json(state.engine.investors().await?))
}

pub async fn get(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Investor>, ServerError> {
    Ok(Json(state.engine.investor(id).await?))
}

pub async fn investor_new(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<InvestorNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = engine::InvestorNew::new(
        payload.name,
        MoneyCents::new(payload.initial_capital_minor),
    );
    cmd.email = payload.email;
    cmd.gender = payload.gender;

    let id = state.engine.create_investor(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn set_capital(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CapitalUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .set_capital(&actor, id, MoneyCents::new(payload.amount_minor))
        .await?;
    Ok(StatusCode::OK)
}

pub async fn delete(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_investor(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
