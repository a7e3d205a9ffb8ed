mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use cardbar::{
    AppState, Config, Ledger, handlers,
    nfc::{NfcReader, ScriptedSource},
};
use clap::Parser;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const KEY: &str = "test-key";

async fn setup_app() -> (common::TestDb, Router, AppState) {
    let db = common::setup_db().await;
    let config = Config::try_parse_from(["cardbar", "--api-key", KEY, "--master-keys", "STAFF01"])
        .unwrap();
    let ledger = Ledger::new(db.pool.clone(), config.ledger_policy().unwrap());
    let nfc = NfcReader::new(
        Arc::new(ScriptedSource::new([vec![0x04, 0xA1, 0xB2]])),
        Duration::from_millis(5),
    );
    let state = AppState {
        ledger,
        config: Arc::new(config),
        nfc: Arc::new(nfc),
    };
    (db, handlers::router(state.clone()), state)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri).header("x-api-key", KEY);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_root_needs_no_key() {
    let (_db, app, _) = setup_app().await;
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_key_required() {
    let (_db, app, _) = setup_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["detail"], "Missing API Key");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("x-api-key", "wrong")
                .header("content-type", "application/json")
                .body(Body::from(json!({"card_id": "X1"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["detail"], "Invalid API Key");
}

#[tokio::test]
async fn test_card_lifecycle_over_http() {
    let (_db, app, _) = setup_app().await;

    let (status, card) = call(
        &app,
        "POST",
        "/api/users",
        Some(json!({"card_id": "ABC123", "is_adult": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(card["balance"], json!(0.0));

    let (status, body) = call(
        &app,
        "POST",
        "/api/users",
        Some(json!({"card_id": "ABC123", "is_adult": false})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "User with NFC ID ABC123 already exists");

    let (status, card) = call(
        &app,
        "POST",
        "/api/users/ABC123/balance/top-up",
        Some(json!({"amount": 20.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["balance"], json!(20.0));

    let (status, card) = call(
        &app,
        "POST",
        "/api/users/ABC123/cocktails/book",
        Some(json!({"name": "Mojito", "price": 7.5, "is_alcoholic": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["balance"], json!(12.5));

    let (status, card) = call(
        &app,
        "PUT",
        "/api/users/ABC123",
        Some(json!({"is_adult": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["is_adult"], json!(false));
    assert_eq!(card["balance"], json!(12.5));

    let (status, cards) = call(&app, "GET", "/api/users?skip=0&limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cards.as_array().unwrap().len(), 1);

    let (status, history) = call(&app, "GET", "/api/users/ABC123/history", None).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 4);
    let purchase = history.iter().find(|e| e["description"] == "Mojito").unwrap();
    assert_eq!(purchase["amount"], json!(-7.5));
    assert_eq!(purchase["current_balance"], json!(12.5));
    // "YYYY-mm-dd HH:MM:SS"
    assert_eq!(purchase["created_at"].as_str().unwrap().len(), 19);

    let (status, _) = call(&app, "DELETE", "/api/users/ABC123", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, "GET", "/api/users/ABC123", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found");

    // History outlives the card
    let (status, history) = call(&app, "GET", "/api/users/ABC123/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(history.as_array().unwrap().iter().any(|e| e["description"] == "Deleted"));
}

#[tokio::test]
async fn test_booking_rejections_map_to_status_codes() {
    let (_db, app, state) = setup_app().await;
    state.ledger.create_card("MINOR1", false).await.unwrap();
    state.ledger.top_up("MINOR1", "5".parse().unwrap()).await.unwrap();

    let (status, body) = call(
        &app,
        "POST",
        "/api/users/MINOR1/cocktails/book",
        Some(json!({"name": "Mojito", "price": 4.0, "is_alcoholic": true})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "User is underage and cannot purchase alcoholic cocktails");

    let (status, body) = call(
        &app,
        "POST",
        "/api/users/MINOR1/cocktails/book",
        Some(json!({"name": "Lemonade", "price": 10.0, "is_alcoholic": false})),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["detail"], "Insufficient balance. Current: 5.00, Required: 10.00");

    let (status, _) = call(
        &app,
        "POST",
        "/api/users/MINOR1/cocktails/book",
        Some(json!({"name": "Free?", "price": 0.0, "is_alcoholic": false})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        "POST",
        "/api/users/NOPE/cocktails/book",
        Some(json!({"name": "Cola", "price": 2.0, "is_alcoholic": false})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        "POST",
        "/api/users/MINOR1/balance/top-up",
        Some(json!({"amount": -5000.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("cannot go below"));
}

#[tokio::test]
async fn test_master_key_booking_over_http() {
    let (_db, app, state) = setup_app().await;
    state.ledger.provision_master_keys().await.unwrap();

    let (status, card) = call(
        &app,
        "POST",
        "/api/users/STAFF01/cocktails/book",
        Some(json!({"name": "Espresso Martini", "price": 11.0, "is_alcoholic": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["balance"], json!(0.0));
}

#[tokio::test]
async fn test_missing_history_is_not_found() {
    let (_db, app, _) = setup_app().await;
    let (status, body) = call(&app, "GET", "/api/users/GHOST/history", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "No logs for GHOST found");

    let (status, _) = call(&app, "DELETE", "/api/users/GHOST", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "PUT", "/api/users/GHOST", Some(json!({"balance": 3.0}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_body_uses_detail_shape() {
    let (_db, app, state) = setup_app().await;
    state.ledger.create_card("ABC123", true).await.unwrap();

    let (status, body) = call(
        &app,
        "POST",
        "/api/users/ABC123/cocktails/book",
        Some(json!({"name": "Mojito", "price": "free", "is_alcoholic": false})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("price"));

    let (status, body) = call(
        &app,
        "POST",
        "/api/users/ABC123/balance/top-up",
        Some(json!({"amount": null})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    let (status, body) = call(&app, "POST", "/api/users", Some(json!({"is_adult": true}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("card_id"));

    // Nothing was charged or logged
    let card = state.ledger.get_card("ABC123").await.unwrap();
    assert_eq!(card.balance, cardbar::Money::ZERO);
    assert_eq!(state.ledger.history("ABC123").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_nfc_scan_mailbox() {
    let (_db, app, state) = setup_app().await;

    let (status, body) = call(&app, "GET", "/api/nfc/scan", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let handle = state.nfc.start_continuous(|_| {});
    tokio::time::sleep(Duration::from_millis(30)).await;
    state.nfc.stop(handle).await;

    let (_, body) = call(&app, "GET", "/api/nfc/scan", None).await;
    assert_eq!(body, json!({"nfc_id": "04A1B2"}));
    let (_, body) = call(&app, "GET", "/api/nfc/scan", None).await;
    assert_eq!(body, Value::Null);
}
