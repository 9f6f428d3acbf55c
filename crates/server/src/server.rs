use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::{net::SocketAddr, sync::Arc};

use crate::{audit, debts, eggs, investors, settings, summary, transactions};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Resolves HTTP Basic credentials against the identity table and stores the
/// resulting `engine::Actor` in the request extensions.
async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let actor = state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await
        .map_err(|err| {
            tracing::error!("authentication failed: {err}");
            StatusCode::UNAUTHORIZED
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Builds the HTTP API around an engine.
pub fn app(engine: Engine) -> Router {
    router(ServerState {
        engine: Arc::new(engine),
    })
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/me", get(summary::me))
        .route("/summary", get(summary::get))
        .route(
            "/investors",
            get(investors::list).post(investors::investor_new),
        )
        .route(
            "/investors/{id}",
            get(investors::get).delete(investors::delete),
        )
        .route("/investors/{id}/capital", put(investors::set_capital))
        .route("/transactions/list", post(transactions::list))
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .patch(transactions::update)
                .delete(transactions::delete),
        )
        .route("/expenses", post(transactions::expense_new))
        .route("/contributions", post(transactions::contribution_new))
        .route("/settlements", post(transactions::settlement_new))
        .route("/eggs", get(eggs::list).post(eggs::eggs_new))
        .route("/eggs/{id}", get(eggs::get).delete(eggs::delete))
        .route(
            "/eggs/{id}/deliveries/{family_id}/confirm",
            post(eggs::confirm),
        )
        .route(
            "/eggs/{id}/deliveries/{family_id}/reject",
            post(eggs::reject),
        )
        .route("/debts", get(debts::list).post(debts::debt_new))
        .route("/debts/{id}", get(debts::get).delete(debts::delete))
        .route("/debts/{id}/payments", post(debts::payment_new))
        .route("/settings", get(settings::get))
        .route("/settings/categories", put(settings::set_categories))
        .route("/settings/families", put(settings::set_families))
        .route("/settings/egg-price", put(settings::set_egg_price))
        .route("/logs", get(audit::logs))
        .route("/notifications", get(audit::notifications))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
