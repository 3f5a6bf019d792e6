// SPDX-License-Identifier: Apache-2.0

//! HTTP transport.
//!
//! `POST /v1/query` runs a query for the tenant named by the request
//! headers. `GET /healthz` and `GET /metrics` are operational endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::engine::error::GatewayError;
use crate::engine::types::{QueryRequest, TenantContext};
use crate::gateway::{new_trace_id, Gateway};
use crate::metrics;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";
pub const ROLES_HEADER: &str = "x-roles";

const ANONYMOUS_USER: &str = "anonymous";

/// Failure body. Rate-limit denials carry `source` and `retry_after_ms`;
/// every other failure carries `message`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
    pub trace_id: String,
}

impl ErrorResponse {
    pub fn from_error(err: &GatewayError, trace_id: &str) -> Self {
        match err {
            GatewayError::RateLimitExhausted {
                source_name,
                retry_after_ms,
            } => Self {
                error: err.error_code().to_string(),
                message: None,
                source: Some(source_name.clone()),
                retry_after_ms: Some(*retry_after_ms),
                trace_id: trace_id.to_string(),
            },
            _ => Self {
                error: err.error_code().to_string(),
                message: Some(err.to_string()),
                source: None,
                retry_after_ms: None,
                trace_id: trace_id.to_string(),
            },
        }
    }
}

pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_snapshot))
        .route("/v1/query", post(query))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics_snapshot() -> impl IntoResponse {
    Json(metrics::snapshot())
}

async fn query(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    req: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let trace_id = new_trace_id();

    let Json(request) = match req {
        Ok(req) => req,
        Err(rejection) => {
            let err = GatewayError::invalid_query(format!(
                "Invalid request body: {}",
                rejection.body_text()
            ));
            return error_response(&err, &trace_id);
        }
    };

    let tenant = tenant_from_headers(&headers, gateway.default_tenant());
    match gateway.query(&request, &tenant, &trace_id).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => error_response(&err, &trace_id),
    }
}

fn error_response(err: &GatewayError, trace_id: &str) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(ErrorResponse::from_error(err, trace_id))).into_response()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Resolves the caller from `x-tenant-id`, `x-user-id` and `x-roles`.
pub fn tenant_from_headers(headers: &HeaderMap, default_tenant: &str) -> TenantContext {
    let tenant_id = header_value(headers, TENANT_HEADER).unwrap_or(default_tenant);
    let user_id = header_value(headers, USER_HEADER).unwrap_or(ANONYMOUS_USER);

    let mut tenant = TenantContext::new(tenant_id, user_id);
    if let Some(roles) = header_value(headers, ROLES_HEADER) {
        for role in roles.split(',').map(str::trim).filter(|r| !r.is_empty()) {
            tenant = tenant.with_role(role);
        }
    }
    tenant
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn tenant_defaults() {
        let tenant = tenant_from_headers(&HeaderMap::new(), "default");
        assert_eq!(tenant.tenant_id, "default");
        assert_eq!(tenant.user_id, "anonymous");
        assert!(tenant.roles.is_empty());
    }

    #[test]
    fn tenant_from_all_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("acme"));
        headers.insert(USER_HEADER, HeaderValue::from_static("srikanth"));
        headers.insert(ROLES_HEADER, HeaderValue::from_static("admin, viewer,,"));

        let tenant = tenant_from_headers(&headers, "default");
        assert_eq!(tenant.tenant_id, "acme");
        assert_eq!(tenant.user_id, "srikanth");
        assert_eq!(tenant.roles.len(), 2);
        assert!(tenant.roles.contains("admin") && tenant.roles.contains("viewer"));
    }

    #[test]
    fn error_bodies() {
        let body = ErrorResponse::from_error(&GatewayError::rate_limited("github"), "t-1");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": "RATE_LIMIT_EXHAUSTED",
                "source": "github",
                "retry_after_ms": 1000,
                "trace_id": "t-1",
            })
        );

        let body = ErrorResponse::from_error(
            &GatewayError::invalid_query("Unsupported data source: gitlab"),
            "t-2",
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": "QUERY_FAILED",
                "message": "Unsupported data source: gitlab",
                "trace_id": "t-2",
            })
        );
    }
}
