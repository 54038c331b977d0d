//! Health check endpoint handler.
//!
//! Served on every host, central or tenant.

use atrium_persistence::tenant::CentralRegistry;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, warn};

use crate::state::AppState;

/// Handler for the health check endpoint.
///
/// Checks the central registry and the tenant store location.
///
/// # HTTP Request
///
/// `GET /health`
///
/// # Response
///
/// - `200 OK` - Registry and stores reachable
/// - `503 Service Unavailable` - Either check failed
pub async fn health_handler(State(state): State<AppState>) -> Response {
    debug!("Processing health check request");

    let registry = state.registry().health_check().await;
    let router = state.router().health_check();

    match (registry, router) {
        (Ok(()), Ok(router)) => {
            let body = json!({
                "status": "healthy",
                "storage": router.storage,
                "open_pools": router.open_pools,
                "timestamp": chrono::Utc::now().to_rfc3339()
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        (registry, router) => {
            let error = registry
                .err()
                .or_else(|| router.err())
                .map(|e| e.to_string())
                .unwrap_or_default();
            warn!(error = %error, "Health check failed");

            let body = json!({
                "status": "unhealthy",
                "error": error,
                "timestamp": chrono::Utc::now().to_rfc3339()
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}
