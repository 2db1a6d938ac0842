//! Telemetry engine state
//!
//! Owns everything that survives between polls: the working tree, the
//! change gate, numeric history, connectivity and the per-category field
//! views. The poll loop writes through `ingest`/`set_connected`; the render
//! side reads through `render`, `tree` and `field_view`.

use crate::change::ChangeDetector;
use crate::field::{FieldView, DEFAULT_MAX_HEIGHT};
use crate::history::{HistoryStore, DEFAULT_HISTORY_CAPACITY};
use crate::sanitize::sanitize;
use crate::spatial::{is_field_like, FieldDimensions, SpatialExtractor};
use crate::tree::{DashboardView, TreeRenderer};
use crate::value::{TelemetryTree, TelemetryValue};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub history_capacity: usize,
    pub field: FieldDimensions,
    pub max_canvas_height: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            field: FieldDimensions::default(),
            max_canvas_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

#[derive(Debug)]
pub struct TelemetryEngine {
    config: EngineConfig,
    renderer: TreeRenderer,
    extractor: SpatialExtractor,
    detector: ChangeDetector,
    history: HistoryStore,
    tree: TelemetryTree,
    field_views: HashMap<String, FieldView>,
    connected: bool,
    last_update: Option<DateTime<Utc>>,
    updates: u64,
}

impl TelemetryEngine {
    pub fn new(config: EngineConfig) -> Self {
        let extractor = SpatialExtractor::new(config.field);
        Self {
            config,
            renderer: TreeRenderer::new(extractor),
            extractor,
            detector: ChangeDetector::new(),
            history: HistoryStore::new(config.history_capacity),
            tree: TelemetryTree::new(),
            field_views: HashMap::new(),
            connected: false,
            last_update: None,
            updates: 0,
        }
    }

    /// Sanitize, gate and absorb one poll result
    ///
    /// Returns `true` when the data changed and downstream state was updated.
    pub fn ingest(&mut self, raw: TelemetryTree) -> bool {
        self.ingest_at(raw, Utc::now())
    }

    pub fn ingest_at(&mut self, raw: TelemetryTree, time: DateTime<Utc>) -> bool {
        let clean = sanitize(&raw);
        if !self.detector.accept(&clean) {
            return false;
        }

        self.history.observe_tree(&clean, time);
        self.tree = clean;
        self.refresh_field_views();
        self.last_update = Some(time);
        self.updates += 1;
        debug!(update = self.updates, "telemetry updated");
        true
    }

    fn refresh_field_views(&mut self) {
        let mut seen = Vec::new();
        for (name, value) in &self.tree {
            let TelemetryValue::Tree(child) = value else {
                continue;
            };
            if !is_field_like(child) {
                continue;
            }
            let scene = self.extractor.extract(child);
            self.field_views
                .entry(name.clone())
                .or_insert_with(|| {
                    info!(category = %name, "field view created");
                    FieldView::new(self.config.field, self.config.max_canvas_height)
                })
                .set_scene(scene);
            seen.push(name.clone());
        }
        self.field_views.retain(|name, _| seen.contains(name));
    }

    pub fn render(&self) -> DashboardView {
        self.renderer.render(&self.tree, &self.history)
    }

    pub fn tree(&self) -> &TelemetryTree {
        &self.tree
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn field_view(&self, category: &str) -> Option<&FieldView> {
        self.field_views.get(category)
    }

    pub fn field_view_mut(&mut self, category: &str) -> Option<&mut FieldView> {
        self.field_views.get_mut(category)
    }

    pub fn field_categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.field_views.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            info!(connected, "connection state changed");
        }
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
