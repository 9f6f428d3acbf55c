//! Debt subledger endpoints

use api_types::{
    Created,
    debt::{DebtNew, DebtPaymentNew, PaymentSource},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Actor, Debt, DebtPaymentCmd, InvestorPayment, MoneyCents};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, to_utc};

pub async fn list(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<Debt>>, ServerError> {
    Ok(Json(state.engine.debts().await?))
}

pub async fn get(
    Extension(_actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Debt>, ServerError> {
    Ok(Json(state.engine.debt(id).await?))
}

pub async fn debt_new(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<DebtNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = engine::DebtNew::new(
        payload.creditor_name,
        MoneyCents::new(payload.total_minor),
        to_utc(payload.occurred_at),
    )
    .deduct_from_fund(payload.deduct_from_fund);
    cmd.meta.note = payload.note;

    let id = state.engine.create_debt(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn payment_new(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DebtPaymentNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let amount = MoneyCents::new(payload.amount_minor);
    let paid_at = to_utc(payload.paid_at);
    let mut cmd = match payload.source {
        PaymentSource::Fund => {
            if !payload.investor_payments.is_empty() {
                return Err(ServerError::Generic(
                    "investor_payments only apply to investor payments".to_string(),
                ));
            }
            DebtPaymentCmd::from_fund(id, amount, paid_at)
        }
        PaymentSource::Investors => {
            let shares = payload
                .investor_payments
                .into_iter()
                .map(|share| InvestorPayment {
                    investor_id: share.investor_id,
                    amount: MoneyCents::new(share.amount_minor),
                })
                .collect();
            DebtPaymentCmd::from_investors(id, amount, shares, paid_at)
        }
    };
    cmd.meta.note = payload.note;

    let payment_id = state.engine.record_payment(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id: payment_id })))
}

pub async fn delete(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_debt(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
