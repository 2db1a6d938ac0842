//! Application state management

use crate::config::ServerConfig;
use anyhow::Result;
use chrono::{DateTime, Utc};
use ort_adapters::{DemoSource, HttpSource};
use ort_core::spatial::FieldDimensions;
use ort_core::value::tree_to_json;
use ort_core::{EngineConfig, TelemetryEngine, TelemetrySource};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// One accepted telemetry update, as pushed to stream subscribers
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryUpdate {
    pub sequence: u64,
    pub time: DateTime<Utc>,
    pub data: serde_json::Value,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Working tree, history, connectivity and field views
    pub engine: Arc<RwLock<TelemetryEngine>>,

    /// Where telemetry comes from
    pub source: Arc<dyn TelemetrySource>,

    /// Broadcast channel for accepted updates
    /// Multiple consumers can subscribe to receive updates
    pub updates_tx: broadcast::Sender<TelemetryUpdate>,

    /// Stops the poll loops
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(engine: EngineConfig, source: Arc<dyn TelemetrySource>) -> Self {
        // Create broadcast channel with capacity for 100 updates
        let (updates_tx, _) = broadcast::channel(100);

        Self {
            engine: Arc::new(RwLock::new(TelemetryEngine::new(engine))),
            source,
            updates_tx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Pick the source named by the configuration
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let engine = config.engine_config();
        let source: Arc<dyn TelemetrySource> = match &config.upstream {
            Some(url) => Arc::new(HttpSource::new(url, config.request_timeout())?),
            None => Arc::new(DemoSource::with_field(FieldDimensions::new(
                config.field_length,
                config.field_width,
            ))),
        };
        info!(source = source.name(), "telemetry source selected");
        Ok(Self::new(engine, source))
    }

    /// Feed one poll result through the engine and notify subscribers on change
    pub async fn ingest(&self, tree: ort_core::TelemetryTree) -> bool {
        let update = {
            let mut engine = self.engine.write().await;
            if !engine.ingest(tree) {
                return false;
            }
            TelemetryUpdate {
                sequence: engine.updates(),
                time: engine.last_update().unwrap_or_else(Utc::now),
                data: tree_to_json(engine.tree()),
            }
        };
        // Ignore error if no receivers (they'll get the next update)
        let _ = self.updates_tx.send(update);
        true
    }

    pub async fn set_connected(&self, connected: bool) {
        self.engine.write().await.set_connected(connected);
    }

    /// Subscribe to accepted updates
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryUpdate> {
        self.updates_tx.subscribe()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(EngineConfig::default(), Arc::new(DemoSource::new()))
    }
}
