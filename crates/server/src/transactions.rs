//! Transactions API endpoints

use api_types::{
    Created,
    transaction::{
        ContributionNew, ExpenseNew, SettlementNew, SettlementType as ApiSettlementType,
        TransactionKind as ApiKind, TransactionList, TransactionListResponse, TransactionUpdate,
        TransactionView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Actor, MoneyCents, Transaction, TransactionDetail};
use uuid::Uuid;

use crate::{ServerError, from_utc, server::ServerState, to_utc};

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 500;

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Expense => ApiKind::Expense,
        engine::TransactionKind::Contribution => ApiKind::Contribution,
        engine::TransactionKind::Settlement => ApiKind::Settlement,
    }
}

fn unmap_kind(kind: ApiKind) -> engine::TransactionKind {
    match kind {
        ApiKind::Expense => engine::TransactionKind::Expense,
        ApiKind::Contribution => engine::TransactionKind::Contribution,
        ApiKind::Settlement => engine::TransactionKind::Settlement,
    }
}

fn map_settlement_type(value: engine::SettlementType) -> ApiSettlementType {
    match value {
        engine::SettlementType::Pay => ApiSettlementType::Pay,
        engine::SettlementType::Receive => ApiSettlementType::Receive,
    }
}

fn unmap_settlement_type(value: ApiSettlementType) -> engine::SettlementType {
    match value {
        ApiSettlementType::Pay => engine::SettlementType::Pay,
        ApiSettlementType::Receive => engine::SettlementType::Receive,
    }
}

fn view(tx: Transaction) -> TransactionView {
    let automated = tx.is_automated();
    let kind = map_kind(tx.detail.kind());
    let (category, investor_id, investor_name, settlement_type) = match tx.detail {
        TransactionDetail::Expense { category } => (Some(category), None, None, None),
        TransactionDetail::Contribution {
            investor_id,
            investor_name,
            ..
        } => (None, Some(investor_id), Some(investor_name), None),
        TransactionDetail::Settlement {
            investor_id,
            investor_name,
            settlement_type,
            ..
        } => (
            None,
            Some(investor_id),
            Some(investor_name),
            Some(map_settlement_type(settlement_type)),
        ),
    };
    TransactionView {
        id: tx.id,
        kind,
        occurred_at: from_utc(tx.occurred_at),
        amount_minor: tx.amount.cents(),
        note: tx.note,
        created_by: tx.created_by,
        category,
        investor_id,
        investor_name,
        settlement_type,
        automated,
    }
}

pub async fn list(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let limit = payload.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(ServerError::Generic(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let filter = engine::TransactionListFilter {
        from: payload.from.map(to_utc),
        to: payload.to.map(to_utc),
        kinds: payload
            .kinds
            .map(|kinds| kinds.into_iter().map(unmap_kind).collect()),
        investor_id: payload.investor_id,
    };

    let (txs, next_cursor) = state
        .engine
        .list_transactions_page(limit, payload.cursor.as_deref(), &filter)
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: txs.into_iter().map(view).collect(),
        next_cursor,
    }))
}

pub async fn get(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(id).await?;
    Ok(Json(view(tx)))
}

pub async fn expense_new(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = engine::ExpenseCmd::new(
        MoneyCents::new(payload.amount_minor),
        payload.category,
        to_utc(payload.occurred_at),
    );
    cmd.meta.note = payload.note;

    let id = state.engine.add_expense(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn contribution_new(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<ContributionNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = engine::ContributionCmd::new(
        payload.investor_id,
        MoneyCents::new(payload.amount_minor),
        to_utc(payload.occurred_at),
    );
    cmd.meta.note = payload.note;

    let id = state.engine.add_contribution(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn settlement_new(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<SettlementNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = engine::SettleCmd::new(
        payload.investor_id,
        MoneyCents::new(payload.amount_minor),
        unmap_settlement_type(payload.settlement_type),
        to_utc(payload.occurred_at),
    );
    cmd.meta.note = payload.note;

    let id = state.engine.settle(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn update(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let update = engine::TransactionUpdate {
        amount: payload.amount_minor.map(MoneyCents::new),
        note: payload.note,
        occurred_at: payload.occurred_at.map(to_utc),
        category: payload.category,
        investor_id: payload.investor_id,
    };
    let tx = state.engine.edit_transaction(&actor, id, update).await?;
    Ok(Json(view(tx)))
}

pub async fn delete(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_transaction(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
