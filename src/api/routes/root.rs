//! Liveness routes.

use axum::Json;
use serde_json::{json, Value};

/// `GET /`: confirms the service is up and points at the real endpoint.
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "askgate is running. Use POST /api/main",
    }))
}

/// `GET /favicon.ico`: empty body so browsers stop logging 404s.
pub async fn favicon() -> Json<Value> {
    Json(json!({}))
}
