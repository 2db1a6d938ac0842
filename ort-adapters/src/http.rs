//! HTTP polling source
//!
//! Reads the telemetry tree from `GET {base}/api/robot-data` and the
//! connection flag from `GET {base}/api/status`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort_core::value::{tree_from_json, TelemetryTree};
use ort_core::TelemetrySource;
use std::time::Duration;
use tracing::debug;

pub const ROBOT_DATA_PATH: &str = "/api/robot-data";
pub const STATUS_PATH: &str = "/api/status";

pub struct HttpSource {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            name: format!("HTTP {}", base_url),
            base_url,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl TelemetrySource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_tree(&self) -> Result<Option<TelemetryTree>> {
        let response = self.client.get(self.url(ROBOT_DATA_PATH)).send().await?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "robot data not available this cycle");
            return Ok(None);
        }

        let json: serde_json::Value = response.json().await?;
        let tree = tree_from_json(json).context("robot data is not a telemetry tree")?;
        Ok(Some(tree))
    }

    async fn status(&self) -> Result<bool> {
        let response = self.client.get(self.url(STATUS_PATH)).send().await?;
        if !response.status().is_success() {
            return Ok(false);
        }

        let json: serde_json::Value = response.json().await?;
        Ok(json
            .get("connected")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false))
    }
}
