//! Liveness probe.

use axum::Json;
use serde_json::{Value, json};

/// Reported in the `service` field of the health body.
pub const SERVICE_NAME: &str = "insightbot";

/// GET /health - Always 200. Never touches a backend.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}
