//! `POST /api/main`: quota-gated question answering.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::api::server::AppState;
use crate::error::AskGateError;

/// Client-facing detail for a spent quota.
pub const QUOTA_EXCEEDED_DETAIL: &str = "Daily free limit reached";

/// Client-facing detail for any provider failure.
pub const UPSTREAM_ERROR_DETAIL: &str = "AI service error.";

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub remaining: u32,
}

// ============================================================================
// Handler
// ============================================================================

/// `POST /api/main`: answer a question if the caller has quota left today.
///
/// Responses:
/// - 200 `{"answer", "remaining"}`
/// - 429 `{"detail": "Daily free limit reached"}`
/// - 500 `{"detail": "AI service error."}`
/// - 422 `{"detail": ...}` when the body is not a valid `AskRequest`
pub async fn ask(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return validation_error(&rejection).into_response(),
    };

    let addr = client_ip(peer, &headers, state.trust_forwarded_for);
    match state
        .gateway
        .ask(&request.user_id, addr, &request.question)
        .await
    {
        Ok(answer) => Json(AskResponse {
            answer: answer.answer,
            remaining: answer.remaining,
        })
        .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// Map a gateway error to its client-visible response. Internal detail is
/// never included.
pub fn error_response(err: &AskGateError) -> (StatusCode, Json<Value>) {
    match err {
        AskGateError::QuotaExceeded(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "detail": QUOTA_EXCEEDED_DETAIL })),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": UPSTREAM_ERROR_DETAIL })),
        ),
    }
}

fn validation_error(rejection: &JsonRejection) -> (StatusCode, Json<Value>) {
    debug!(error = %rejection.body_text(), "rejected request body");
    let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        StatusCode::PAYLOAD_TOO_LARGE
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(json!({ "detail": rejection.body_text() })))
}

/// The address quota is charged to: the TCP peer, or the first
/// `X-Forwarded-For` hop when the proxy is trusted and the header parses.
fn client_ip(peer: SocketAddr, headers: &HeaderMap, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }
    peer.ip()
}

// ============================================================================
// Tests
// ============================================================================
