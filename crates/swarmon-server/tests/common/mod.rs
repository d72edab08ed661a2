#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use swarmon_common::types::Reading;
use swarmon_server::app;
use swarmon_server::config::ServerConfig;
use swarmon_server::state::AppState;
use tower::util::ServiceExt;

pub struct TestContext {
    pub state: AppState,
    pub app: axum::Router,
}

pub fn build_test_context() -> Result<TestContext> {
    build_test_context_with(ServerConfig::default())
}

pub fn build_test_context_with(config: ServerConfig) -> Result<TestContext> {
    config.validate()?;
    let state = AppState::new(config);
    let app = app::build_http_app(state.clone());
    Ok(TestContext { state, app })
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let req_body = body.unwrap_or(Value::Null).to_string();
    request_raw(app, method, uri, &req_body).await
}

pub async fn request_raw(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: &str,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build");
    send(app, req).await
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    send(app, req).await
}

/// Records a reading directly in the store, as if it had been ingested at `at`.
pub fn ingest_at(state: &AppState, device_id: &str, temperature: f64, at: DateTime<Utc>) {
    state
        .store
        .ingest(Reading::new(device_id, temperature, 50.0, at), at);
}

pub fn assert_ok_envelope(json: &Value) {
    assert_eq!(json["err_code"], 0);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
}

pub fn assert_err_envelope(json: &Value, err_code: i32) {
    assert_eq!(json["err_code"], err_code);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
    assert!(json.get("data").is_some());
    assert!(json["data"].is_null());
}

pub fn decode_data<T: DeserializeOwned>(json: &Value) -> T {
    serde_json::from_value(json["data"].clone()).expect("data should decode")
}
