use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Actor, Engine, InvestorNew, MoneyCents, Role, User};
use migration::MigratorTrait;

const ADMIN: (&str, &str) = ("ops@farm", "secret");
const MEMBER: (&str, &str) = ("ada@farm", "hunter2");

async fn setup() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();

    let root = Actor::new("root@farm", Role::SuperAdmin);
    let ada = engine
        .create_investor(&root, InvestorNew::new("Ada", MoneyCents::new(100_000)))
        .await
        .unwrap();
    engine
        .create_user(
            &root,
            User {
                email: ADMIN.0.to_string(),
                password: ADMIN.1.to_string(),
                role: Role::Admin,
                investor_id: None,
            },
        )
        .await
        .unwrap();
    engine
        .create_user(
            &root,
            User {
                email: MEMBER.0.to_string(),
                password: MEMBER.1.to_string(),
                role: Role::Investor,
                investor_id: Some(ada),
            },
        )
        .await
        .unwrap();

    server::app(engine)
}

fn basic((user, password): (&str, &str)) -> String {
    let token = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
    format!("Basic {token}")
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    credentials: (&str, &str),
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic(credentials));
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn missing_or_wrong_credentials_are_rejected() {
    let app = setup().await;

    let request = Request::builder()
        .uri("/summary")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_ne!(response.status(), StatusCode::OK);

    let (status, _) = send(&app, "GET", "/summary", ("ops@farm", "nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_the_resolved_actor() {
    let app = setup().await;

    let (status, body) = send(&app, "GET", "/me", MEMBER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@farm");
    assert_eq!(body["role"], "investor");
    assert!(body["investor_id"].is_string());
}

#[tokio::test]
async fn expenses_flow_into_the_summary() {
    let app = setup().await;

    let (status, body) = send(
        &app,
        "POST",
        "/expenses",
        ADMIN,
        Some(json!({
            "amount_minor": 25_000,
            "category": "feed",
            "note": "corn",
            "occurred_at": "2026-03-01T10:00:00+01:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_string());

    let (status, summary) = send(&app, "GET", "/summary", MEMBER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_expenses"], 25_000);
    assert_eq!(summary["fund_balance"], 75_000);

    let (status, page) = send(
        &app,
        "POST",
        "/transactions/list",
        MEMBER,
        Some(json!({ "kinds": ["expense"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(page["transactions"][0]["category"], "feed");
    assert!(page["next_cursor"].is_null());
}

#[tokio::test]
async fn investors_get_403_on_admin_writes() {
    let app = setup().await;

    let (status, body) = send(
        &app,
        "POST",
        "/expenses",
        MEMBER,
        Some(json!({
            "amount_minor": 1_000,
            "category": "feed",
            "occurred_at": "2026-03-01T10:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("admin"));
}

#[tokio::test]
async fn unknown_records_are_404_and_bad_amounts_are_422() {
    let app = setup().await;

    let (status, _) = send(
        &app,
        "GET",
        "/debts/6a1f7c9e-0000-4000-8000-000000000000",
        ADMIN,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/debts",
        ADMIN,
        Some(json!({
            "creditor_name": "Vet",
            "total_minor": 0,
            "occurred_at": "2026-03-01T10:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn debt_payment_over_http() {
    let app = setup().await;

    let (_, created) = send(
        &app,
        "POST",
        "/debts",
        ADMIN,
        Some(json!({
            "creditor_name": "Feed store",
            "total_minor": 10_000,
            "deduct_from_fund": true,
            "occurred_at": "2026-03-01T10:00:00Z",
        })),
    )
    .await;
    let debt_id = created["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/debts/{debt_id}/payments"),
        ADMIN,
        Some(json!({
            "amount_minor": 4_000,
            "source": "fund",
            "paid_at": "2026-03-02T10:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, debt) = send(&app, "GET", &format!("/debts/{debt_id}"), MEMBER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(debt["status"], "partial");
    assert_eq!(debt["remaining_amount"], 6_000);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/debts/{debt_id}/payments"),
        ADMIN,
        Some(json!({
            "amount_minor": 7_000,
            "source": "fund",
            "paid_at": "2026-03-03T10:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn audit_feeds_are_newest_first() {
    let app = setup().await;

    send(
        &app,
        "PUT",
        "/settings/egg-price",
        ADMIN,
        Some(json!({ "egg_price_minor": 50 })),
    )
    .await;

    let (status, logs) = send(&app, "GET", "/logs?limit=1", MEMBER, None).await;
    assert_eq!(status, StatusCode::OK);
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["type"], "settings");

    let (status, settings) = send(&app, "GET", "/settings", MEMBER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["family_settings"]["egg_price"], 50);
}
