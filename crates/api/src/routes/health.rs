//! Banner and health endpoints.

use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde_json::{Value, json};

use super::extract::Json;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

async fn banner() -> Json<Value> {
    Json(json!({
        "message": "EKart Store API is running!",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness: the process is serving requests. Dependencies are not checked.
async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "ekart-api" }))
}

/// Readiness: 503 when the store cannot be reached.
async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.stores().health.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
