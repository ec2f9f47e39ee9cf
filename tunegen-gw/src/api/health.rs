//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use tunegen_common::types::HealthResponse;

use crate::AppState;

/// GET /api/health
///
/// `ok` is false when no provider API token is configured; the service
/// still accepts submissions in that state, but every job fails with a
/// configuration error.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(HealthResponse {
        ok: state.provider.is_configured(),
        provider: state.provider.name().to_string(),
        model: state.provider.model().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/api/health", get(health_check))
}
