//! OpenRobotTelemetry Server
//!
//! Polls a telemetry source and serves the dashboard and REST API

use anyhow::Result;
use ort_server::{api, config::ServerConfig, poller, state::AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting OpenRobotTelemetry Server");

    let config = ServerConfig::load()?;

    // Create application state
    let state = AppState::from_config(&config)?;

    // Build the router
    let app = api::create_router(state.clone());

    // Start poll loops in background
    poller::spawn(
        state.clone(),
        config.poll_interval(),
        config.status_interval(),
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
