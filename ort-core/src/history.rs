//! Bounded per-path numeric history
//!
//! Each numeric leaf seen during ingestion gets a series keyed by its dotted
//! path. Series are created lazily and evict FIFO once they reach capacity.

use crate::value::{TelemetryTree, TelemetryValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// One observation of a numeric path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Time series per dotted path, each capped at `capacity` points
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    series: HashMap<String, VecDeque<HistoryPoint>>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one observation, evicting the oldest point when full
    pub fn record(&mut self, path: &str, value: f64, time: DateTime<Utc>) {
        let capacity = self.capacity;
        let series = self
            .series
            .entry(path.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        series.push_back(HistoryPoint { time, value });
        while series.len() > capacity {
            series.pop_front();
        }
    }

    /// Record every numeric leaf of `tree`, all stamped with `time`
    pub fn observe_tree(&mut self, tree: &TelemetryTree, time: DateTime<Utc>) {
        self.observe_level(tree, "", time);
    }

    fn observe_level(&mut self, tree: &TelemetryTree, prefix: &str, time: DateTime<Utc>) {
        for (key, value) in tree {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            match value {
                TelemetryValue::Number(n) => self.record(&path, *n, time),
                TelemetryValue::Tree(child) => self.observe_level(child, &path, time),
                _ => {}
            }
        }
    }

    pub fn series(&self, path: &str) -> Option<&VecDeque<HistoryPoint>> {
        self.series.get(path)
    }

    /// Values only, oldest first
    pub fn values(&self, path: &str) -> Vec<f64> {
        self.series
            .get(path)
            .map(|s| s.iter().map(|p| p.value).collect())
            .unwrap_or_default()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
