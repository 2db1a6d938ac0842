//! Server configuration
//!
//! Layered with the `config` crate: built-in defaults, `ort.toml` in the
//! platform config directory, `ort.toml` in the working directory, then
//! `ORT_*` environment variables. Later layers win.

use anyhow::{bail, Result};
use config::{Config, Environment, File};
use ort_core::field::DEFAULT_MAX_HEIGHT;
use ort_core::history::DEFAULT_HISTORY_CAPACITY;
use ort_core::spatial::FieldDimensions;
use ort_core::EngineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "ort.toml";
pub const ENV_PREFIX: &str = "ORT";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    /// Base URL of the upstream telemetry server; the demo source is used when unset
    pub upstream: Option<String>,
    pub poll_interval_ms: u64,
    pub status_interval_ms: u64,
    pub history_capacity: usize,
    pub field_length: f64,
    pub field_width: f64,
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let field = FieldDimensions::default();
        Self {
            bind: "0.0.0.0:9100".to_string(),
            upstream: None,
            poll_interval_ms: 100,
            status_interval_ms: 1000,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            field_length: field.length.0,
            field_width: field.width.0,
            request_timeout_ms: 500,
        }
    }
}

impl ServerConfig {
    /// Load from the standard locations
    pub fn load() -> Result<Self> {
        let mut files = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            files.push(dir.join("openrobottelemetry").join(CONFIG_FILE_NAME));
        }
        files.push(PathBuf::from(CONFIG_FILE_NAME));
        Self::from_files(&files)
    }

    /// Defaults, then each file that exists (in order), then the environment
    pub fn from_files<P: AsRef<Path>>(files: &[P]) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("bind", defaults.bind)?
            .set_default("poll_interval_ms", defaults.poll_interval_ms as i64)?
            .set_default("status_interval_ms", defaults.status_interval_ms as i64)?
            .set_default("history_capacity", defaults.history_capacity as i64)?
            .set_default("field_length", defaults.field_length)?
            .set_default("field_width", defaults.field_width)?
            .set_default("request_timeout_ms", defaults.request_timeout_ms as i64)?;

        for path in files {
            builder = builder.add_source(File::from(path.as_ref()).required(false));
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        // An empty ORT_UPSTREAM means "no upstream"
        if config.upstream.as_deref().is_some_and(|u| u.trim().is_empty()) {
            config.upstream = None;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, meters) in [
            ("field_length", self.field_length),
            ("field_width", self.field_width),
        ] {
            if !meters.is_finite() || meters <= 0.0 {
                bail!("{} must be a positive number of meters, got {}", name, meters);
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            history_capacity: self.history_capacity,
            field: FieldDimensions::new(self.field_length, self.field_width),
            max_canvas_height: DEFAULT_MAX_HEIGHT,
        }
    }
}
