//! Venture settings endpoints

use api_types::settings::{CategoriesUpdate, EggPriceUpdate, FamiliesUpdate};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::{Actor, ExpenseCategories, Family, FamilySettings, MoneyCents, Settings};

use crate::{ServerError, server::ServerState};

pub async fn get(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<Settings>, ServerError> {
    Ok(Json(state.engine.settings().await?))
}

pub async fn set_categories(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoriesUpdate>,
) -> Result<Json<ExpenseCategories>, ServerError> {
    let stored = state
        .engine
        .set_expense_categories(&actor, payload.categories)
        .await?;
    Ok(Json(stored))
}

pub async fn set_families(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<FamiliesUpdate>,
) -> Result<Json<FamilySettings>, ServerError> {
    let families = payload
        .families
        .into_iter()
        .map(|family| Family {
            id: family.id,
            name: family.name,
            icon: family.icon,
            member_count: family.member_count,
            investor_ids: family.investor_ids,
        })
        .collect();
    let stored = state.engine.save_families(&actor, families).await?;
    Ok(Json(stored))
}

pub async fn set_egg_price(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<EggPriceUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .set_egg_price(&actor, MoneyCents::new(payload.egg_price_minor))
        .await?;
    Ok(StatusCode::OK)
}
