// SPDX-License-Identifier: Apache-2.0

//! HTTP surface driven through the router without binding a socket.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value as Json;
use tower::ServiceExt;

use querygate::engine::connectors::demo_registry;
use querygate::policy::PolicyStore;
use querygate::{http, Gateway, GatewayConfig};

fn app_with(config: GatewayConfig) -> Router {
    let gateway = Gateway::new(
        demo_registry().unwrap(),
        Arc::new(PolicyStore::default()),
        &config,
    );
    http::router(Arc::new(gateway))
}

fn app() -> Router {
    app_with(GatewayConfig::default())
}

fn query_request(body: &str, tenant: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/v1/query")
        .header("content-type", "application/json");
    if let Some(tenant) = tenant {
        builder = builder.header("x-tenant-id", tenant);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Json) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, json)
}

#[tokio::test]
async fn healthz_is_ok() {
    let response = app()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn query_then_cached_query() {
    let app = app();
    let body = r#"{"sql": "SELECT id, title FROM github.pull_requests", "max_staleness_ms": 30000}"#;

    let (status, first) = send(&app, query_request(body, Some("acme"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["columns"], serde_json::json!(["id", "title"]));
    assert_eq!(first["rows"][0], serde_json::json!({"id": 1, "title": "Fix bug"}));
    assert_eq!(first["cache_source"]["github"], "live");
    assert_eq!(first["rate_limit_status"], "OK");
    assert!(first["trace_id"].as_str().is_some_and(|t| !t.is_empty()));

    let (status, second) = send(&app, query_request(body, Some("acme"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cache_source"]["github"], "cache");
    assert!(second["freshness_ms"].as_u64() >= first["freshness_ms"].as_u64());
    assert_ne!(second["trace_id"], first["trace_id"]);
}

#[tokio::test]
async fn missing_sql_is_a_bad_request() {
    let (status, body) = send(&app(), query_request("{}", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "QUERY_FAILED");
    assert_eq!(body["message"], "SQL query is required");
    assert!(body["trace_id"].is_string());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (status, body) = send(&app(), query_request("{not json", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "QUERY_FAILED");
}

#[tokio::test]
async fn unsupported_source_is_a_bad_request() {
    let (status, body) = send(
        &app(),
        query_request(r#"{"sql": "SELECT * FROM gitlab.merge_requests"}"#, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unsupported data source: gitlab");
}

#[tokio::test]
async fn rate_limited_source_returns_429() {
    let app = app_with(GatewayConfig {
        rate_limits: HashMap::from([("github".to_string(), 1)]),
        ..GatewayConfig::default()
    });
    let body = r#"{"sql": "SELECT * FROM github.pull_requests"}"#;

    let (status, _) = send(&app, query_request(body, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, denied) = send(&app, query_request(body, None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(denied["error"], "RATE_LIMIT_EXHAUSTED");
    assert_eq!(denied["source"], "github");
    assert_eq!(denied["retry_after_ms"], 1000);
    assert!(denied.get("rows").is_none());
}

#[tokio::test]
async fn metrics_endpoint_reports_connectors() {
    let app = app();
    let (status, _) = send(
        &app,
        query_request(r#"{"sql": "SELECT * FROM jira.issues"}"#, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, metrics) = send(
        &app,
        Request::get("/metrics").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(metrics["queries"]["total"].as_u64().unwrap_or(0) >= 1);
    assert!(metrics["connectors"]["jira"]["requests_total"].as_u64().unwrap_or(0) >= 1);
}
