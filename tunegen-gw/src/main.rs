//! tunegen-gw - Generative-Music Gateway
//!
//! Accepts text or audio submissions, forwards them to a hosted
//! generative-music model, and tracks each job in an in-memory registry
//! until the caller collects a downloadable audio URL via polling.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use tunegen_common::config::Config;
use tunegen_gw::services::ReplicateClient;
use tunegen_gw::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Pick up REPLICATE_API_TOKEN etc. from a local .env, if any
    let _ = dotenvy::dotenv();

    info!("Starting tunegen-gw (Generative-Music Gateway)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;

    let provider = Arc::new(ReplicateClient::new(&config.provider)?);
    info!(
        provider = "replicate",
        model = %config.provider.model,
        configured = config.provider_configured(),
        "remote music provider ready"
    );
    if !config.provider_configured() {
        warn!("no provider API token configured; submissions will fail until REPLICATE_API_TOKEN is set");
    }

    // Transient upload storage
    tokio::fs::create_dir_all(&config.tmp_dir).await?;
    info!("Upload scratch dir: {}", config.tmp_dir.display());

    let bind_addr = config.bind_addr;
    let state = AppState::new(config, provider);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/api/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
