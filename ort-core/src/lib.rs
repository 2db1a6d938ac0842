//! OpenRobotTelemetry Core Library
//!
//! This crate provides the telemetry classification and field visualization
//! engine: sanitizing and change-gating schema-less telemetry trees, keeping
//! bounded numeric history, classifying leaves into widgets, and extracting
//! and drawing robot poses and trajectories on a field map.

pub mod canvas;
pub mod change;
pub mod engine;
pub mod field;
pub mod history;
pub mod sanitize;
pub mod source;
pub mod spatial;
pub mod tree;
pub mod units;
pub mod value;
pub mod widget;

pub use engine::{EngineConfig, TelemetryEngine};
pub use source::TelemetrySource;
pub use value::{TelemetryTree, TelemetryValue};
