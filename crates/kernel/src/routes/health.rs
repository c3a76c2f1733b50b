//! Health check route.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde_json::json;

use crate::state::AppState;

/// Create the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Health check handler reporting page store reachability.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if state.pages().check_health().await {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded" })),
        )
    }
}
