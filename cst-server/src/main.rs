//! CanSat Telemetry Server
//!
//! Runs the telemetry engine and serves its snapshot over HTTP and SSE

use anyhow::Result;
use cst_adapters::TcpRelayLink;
use cst_server::{api, config::Settings, engine::TelemetryEngine, state};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // The log filter comes from the settings, so loading them logs through
    // a plain subscriber
    let settings =
        tracing::subscriber::with_default(tracing_subscriber::fmt().finish(), Settings::load)?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .init();

    info!("Starting CanSat Telemetry Server");

    let link = Arc::new(TcpRelayLink::new(settings.relay.address.clone()));
    info!("Hardware relay at {}", link.address());

    let engine = TelemetryEngine::new(settings.simulation.clone(), link);
    let state = state::AppState::new(engine.clone());

    // Build the router
    let app = api::create_router(state);

    // Start server
    let addr = settings.server.addr()?;
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.stop().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
