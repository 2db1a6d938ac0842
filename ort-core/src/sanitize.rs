//! Removal of subtrees the dashboard never displays
//!
//! Swerve module internals and PathPlanner bookkeeping are noisy and large;
//! any key whose lower-cased name contains one of the blocked fragments is
//! dropped together with everything below it.

use crate::value::{TelemetryTree, TelemetryValue};

const BLOCKED_FRAGMENTS: &[&str] = &["module", "pathplanner"];

pub fn is_blocked_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    BLOCKED_FRAGMENTS.iter().any(|f| lower.contains(f))
}

/// Return a copy of `tree` without blocked keys
pub fn sanitize(tree: &TelemetryTree) -> TelemetryTree {
    tree.iter()
        .filter(|(key, _)| !is_blocked_key(key))
        .map(|(key, value)| (key.clone(), sanitize_value(value)))
        .collect()
}

fn sanitize_value(value: &TelemetryValue) -> TelemetryValue {
    match value {
        TelemetryValue::Tree(tree) => TelemetryValue::Tree(sanitize(tree)),
        TelemetryValue::Array(items) => {
            TelemetryValue::Array(items.iter().map(sanitize_value).collect())
        }
        other => other.clone(),
    }
}
