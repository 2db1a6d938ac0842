//! Telemetry source trait definition

use crate::value::TelemetryTree;
use anyhow::Result;
use async_trait::async_trait;

/// Trait for upstream telemetry sources
///
/// Each source is responsible for:
/// - Delivering the full telemetry tree on request
/// - Reporting whether the robot end is reachable
///
/// Sources are polled on fixed intervals; they never push.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Get the name of this source (e.g., "Demo", "HTTP http://10.0.0.2:5810")
    fn name(&self) -> &str;

    /// Read the current telemetry tree
    ///
    /// Returns:
    /// - `Ok(Some(tree))` if a snapshot is available
    /// - `Ok(None)` if there is no update this cycle (e.g. non-200 response)
    /// - `Err(_)` if the transport failed
    async fn fetch_tree(&self) -> Result<Option<TelemetryTree>>;

    /// Check whether the robot is connected
    async fn status(&self) -> Result<bool>;
}
