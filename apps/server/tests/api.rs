use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use networth_server::{api::app_router, build_state, config::Config};
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::ServiceExt;

const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";

/// Router backed by a fresh database, with no provider keys (mock prices).
async fn test_app() -> (Router, tempfile::TempDir) {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("test.db").to_string_lossy().to_string();
    let config = Config::from_lookup(|key| match key {
        "NW_DB_PATH" => Some(db_path.clone()),
        "NW_ENCRYPTION_KEY" => Some(TEST_KEY.to_string()),
        _ => None,
    })
    .unwrap();
    let state = build_state(&config).await.unwrap();
    (app_router(state, &config).unwrap(), tmp)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(
            body.map(|b| Body::from(b.to_string()))
                .unwrap_or_else(Body::empty),
        )
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, value)
}

fn plaid_key(key: &str) -> Value {
    json!({
        "serviceType": "plaid",
        "credentialType": "api_key",
        "name": "Plaid sandbox",
        "data": { "key": key, "environment": "sandbox" }
    })
}

#[tokio::test]
async fn healthz_works() {
    let (app, _tmp) = test_app().await;
    let (status, body) = send(&app, "GET", "/api/v1/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn credential_lifecycle() {
    let (app, _tmp) = test_app().await;

    let (status, created) = send(&app, "POST", "/api/v1/credentials", Some(plaid_key("pk-1"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["serviceType"], "plaid");
    assert_eq!(created["credentialType"], "api_key");
    assert_eq!(created["isActive"], true);
    assert!(created.get("encryptedData").is_none());

    let (status, body) = send(&app, "POST", "/api/v1/credentials", Some(plaid_key("pk-2"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);

    let (status, fetched) = send(&app, "GET", "/api/v1/credentials/plaid", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/v1/credentials/plaid",
        Some(json!({ "credentialType": "api_key", "data": { "key": "pk-3" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, check) = send(&app, "POST", "/api/v1/credentials/plaid/test", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check, json!({ "serviceType": "plaid", "ok": true }));

    let (status, list) = send(&app, "GET", "/api/v1/credentials", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&app, "DELETE", "/api/v1/credentials/plaid", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", "/api/v1/credentials/plaid", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/api/v1/credentials/plaid", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "POST", "/api/v1/credentials/plaid/test", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/api/v1/credentials", Some(plaid_key("pk-4"))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn credential_input_errors_are_bad_requests() {
    let (app, _tmp) = test_app().await;

    let (status, _) = send(&app, "GET", "/api/v1/credentials/robinhood", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/credentials",
        Some(json!({
            "serviceType": "kraken",
            "credentialType": "api_key",
            "name": "Kraken",
            "data": { "key": "" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/credentials",
        Some(json!({
            "serviceType": "kraken",
            "credentialType": "basic_auth",
            "name": "Kraken",
            "data": { "username": "alice" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(&app, "POST", "/api/v1/credentials", Some(plaid_key("pk"))).await;
    let (status, _) = send(
        &app,
        "PUT",
        "/api/v1/credentials/plaid",
        Some(json!({
            "credentialType": "basic_auth",
            "data": { "username": "alice", "password": "pw" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mock_prices_are_cached() {
    let (app, _tmp) = test_app().await;

    let (status, first) = send(&app, "POST", "/api/v1/prices/aapl/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["symbol"], "AAPL");
    assert_eq!(first["path"], "mock");
    assert_eq!(first["source"], "mock");
    assert_eq!(first["isStale"], false);

    let (status, second) = send(&app, "POST", "/api/v1/prices/AAPL/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["path"], "cache");
    assert_eq!(second["price"], first["price"]);

    let (status, cached) = send(&app, "GET", "/api/v1/prices/AAPL", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cached["price"], first["price"]);

    let (status, history) = send(&app, "GET", "/api/v1/prices/AAPL/history?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&app, "GET", "/api/v1/prices/MSFT", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, report) = send(&app, "GET", "/api/v1/prices/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["mode"], "development");
    assert_eq!(report["symbols"][0]["symbol"], "AAPL");
    assert_eq!(report["symbols"][0]["isFresh"], true);
}

#[tokio::test]
async fn batch_refresh() {
    let (app, _tmp) = test_app().await;

    let (status, result) = send(
        &app,
        "POST",
        "/api/v1/prices/refresh",
        Some(json!({ "symbols": ["VTI", " ", "BND"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["refreshed"].as_array().map(Vec::len), Some(2));
    assert_eq!(result["failed"].as_array().map(Vec::len), Some(1));

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/prices/refresh",
        Some(json!({ "symbols": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_batch_is_rejected_before_any_refresh() {
    let (app, _tmp) = test_app().await;

    let symbols: Vec<String> = (0..51).map(|i| format!("SYM{}", i)).collect();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/prices/refresh",
        Some(json!({ "symbols": symbols })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, report) = send(&app, "GET", "/api/v1/prices/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["symbols"].as_array().map(Vec::len), Some(0));

    let (status, result) = send(
        &app,
        "POST",
        "/api/v1/prices/refresh",
        Some(json!({ "symbols": &symbols[..50] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["refreshed"].as_array().map(Vec::len), Some(50));
}
