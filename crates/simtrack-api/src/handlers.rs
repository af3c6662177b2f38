//! Service-identity and liveness endpoints.

use axum::Json;

/// Serve the service-identity document.
///
/// # Route
///
/// `GET /`
#[allow(clippy::unused_async)]
pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Simtrack Simulation Scheduling API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness check.
///
/// # Route
///
/// `GET /health`
#[allow(clippy::unused_async)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
