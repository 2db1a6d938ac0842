//! OpenRobotTelemetry Server Library
//!
//! Exposes server components for integration testing.

pub mod api;
pub mod config;
pub mod html;
pub mod poller;
pub mod state;
