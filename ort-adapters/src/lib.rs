//! Telemetry sources for OpenRobotTelemetry

pub mod demo;
pub mod http;
pub mod topics;

pub use demo::DemoSource;
pub use http::HttpSource;
pub use topics::TopicTree;
