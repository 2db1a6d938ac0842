//! Telemetry poll loops
//!
//! Two independent timers: one fetches the telemetry tree, the other the
//! upstream connection flag. Every tick spawns its own task and never waits
//! for the previous one, so a slow upstream can have several requests in
//! flight. Both loops end when the state's shutdown token is cancelled.

use crate::state::AppState;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Fetch the tree once and feed it to the engine
///
/// On a transport failure the last good tree stays in place and the
/// connection is marked down.
pub async fn poll_once(state: &AppState) {
    match state.source.fetch_tree().await {
        Ok(Some(tree)) => {
            if state.ingest(tree).await {
                debug!("accepted telemetry update");
            }
        }
        Ok(None) => {
            debug!(source = state.source.name(), "no telemetry available");
        }
        Err(e) => {
            warn!(source = state.source.name(), "Error fetching telemetry: {:#}", e);
            state.set_connected(false).await;
        }
    }
}

/// Refresh the connection flag once
pub async fn status_once(state: &AppState) {
    match state.source.status().await {
        Ok(connected) => state.set_connected(connected).await,
        Err(e) => {
            warn!(source = state.source.name(), "Error fetching status: {:#}", e);
            state.set_connected(false).await;
        }
    }
}

/// Start both loops in the background
pub fn spawn(state: AppState, poll_every: Duration, status_every: Duration) {
    info!(
        source = state.source.name(),
        poll_ms = poll_every.as_millis() as u64,
        status_ms = status_every.as_millis() as u64,
        "Poller started"
    );
    tokio::spawn(run_telemetry(state.clone(), poll_every));
    tokio::spawn(run_status(state, status_every));
}

async fn run_telemetry(state: AppState, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let state = state.clone();
                tokio::spawn(async move { poll_once(&state).await });
            }
        }
    }
    info!("Telemetry poll loop stopped");
}

async fn run_status(state: AppState, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let state = state.clone();
                tokio::spawn(async move { status_once(&state).await });
            }
        }
    }
    info!("Status poll loop stopped");
}
