//! Liveness endpoint.

use axum::Json;
use serde_json::{json, Value};

/// GET /api/health — process is up; says nothing about the upstream.
pub async fn get_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
