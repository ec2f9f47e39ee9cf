//! tunegen-gw library interface
//!
//! Exposes `AppState` and `build_router` so integration tests can drive the
//! HTTP surface in-process.

pub mod api;
pub mod error;
pub mod models;
pub mod registry;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tunegen_common::config::Config;

use crate::registry::TaskRegistry;
use crate::services::{JobRunner, MusicModelProvider};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Shared task registry, written by jobs and read by the status endpoint
    pub registry: TaskRegistry,
    /// Remote inference provider handle
    pub provider: Arc<dyn MusicModelProvider>,
    /// Bounded background job pool
    pub jobs: JobRunner,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn MusicModelProvider>) -> Self {
        let registry = TaskRegistry::new();
        let jobs = JobRunner::new(
            registry.clone(),
            Arc::clone(&provider),
            config.worker.max_concurrent_jobs,
        );
        Self {
            config: Arc::new(config),
            registry,
            provider,
            jobs,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::generate_routes())
        .merge(api::convert_routes())
        .merge(api::status_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
