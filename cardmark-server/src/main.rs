//! Cardmark Server - REST API for membership card issuance and verification
//!
//! Endpoints:
//! - POST /api/register - Issue a card for an uploaded photo
//! - POST /api/verify   - Verify an uploaded card
//! - GET  /api/cards/{id} - Download a recently issued card
//! - GET  /health, GET /ready

use std::net::SocketAddr;
use std::sync::Arc;

use cardmark_server::{create_router_with_config, AppState, ArtifactStore, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cardmark_server=info,cardmark_core=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    let config = Config::from_env();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        artifact_dir = %config.artifact_dir.display(),
        artifact_ttl_secs = config.artifact_ttl_secs,
        ledger = config.ledger_url.as_deref().unwrap_or("disabled"),
        "Starting cardmark-server"
    );

    let ledger = config.build_ledger()?;
    if ledger.is_none() {
        tracing::warn!("LEDGER_URL not set: cards will not be anchored, ownership checks disabled");
    }

    let artifacts = Arc::new(ArtifactStore::open(&config.artifact_dir, config.artifact_ttl()).await?);
    let janitor = artifacts.clone().spawn_janitor(config.janitor_interval());

    let state = AppState::new(&config, ledger, artifacts)?;
    let app = create_router_with_config(&config, state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    // Peer addresses are needed by the rate limiter's key extractor
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    janitor.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
