//! Widget classification for telemetry leaves
//!
//! `classify` maps a `(key, value)` pair to a widget kind by walking an
//! ordered rule table; the first matching rule wins. Reordering the table
//! changes the result for ambiguous keys (a numeric `batteryVoltage` is a
//! progress bar, not a gauge), so the order is part of the contract.

use crate::value::TelemetryValue;
use serde::{Deserialize, Serialize};

/// Type tag value published by string choosers
pub const CHOOSER_TYPE: &str = "String Chooser";

/// Metadata key carrying a type tag
pub const TYPE_KEY: &str = ".type";

pub const PROGRESS_KEYWORDS: &[&str] = &[
    "percent", "battery", "pressure", "capacity", "level", "progress",
];

pub const GAUGE_KEYWORDS: &[&str] = &[
    "speed",
    "velocity",
    "angle",
    "position",
    "distance",
    "voltage",
    "current",
    "temperature",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    BooleanIndicator,
    NumberGauge,
    ProgressBar,
    Chooser,
    Default,
}

type Rule = fn(&str, &TelemetryValue) -> bool;

/// Precedence order of the classifier
const RULES: &[(Rule, WidgetKind)] = &[
    (is_boolean, WidgetKind::BooleanIndicator),
    (is_progress, WidgetKind::ProgressBar),
    (is_gauge, WidgetKind::NumberGauge),
    (is_chooser_rule, WidgetKind::Chooser),
];

pub fn classify(key: &str, value: &TelemetryValue) -> WidgetKind {
    let lower = key.to_lowercase();
    RULES
        .iter()
        .find(|(rule, _)| rule(&lower, value))
        .map(|(_, kind)| *kind)
        .unwrap_or(WidgetKind::Default)
}

fn is_boolean(_key: &str, value: &TelemetryValue) -> bool {
    matches!(value, TelemetryValue::Bool(_))
}

fn is_progress(key: &str, value: &TelemetryValue) -> bool {
    value.is_number() && PROGRESS_KEYWORDS.iter().any(|k| key.contains(k))
}

fn is_gauge(key: &str, value: &TelemetryValue) -> bool {
    value.is_number() && GAUGE_KEYWORDS.iter().any(|k| key.contains(k))
}

fn is_chooser_rule(_key: &str, value: &TelemetryValue) -> bool {
    is_chooser(value)
}

/// A tree tagged as a string chooser, or one exposing `options`/`selected`
pub fn is_chooser(value: &TelemetryValue) -> bool {
    match value {
        TelemetryValue::Tree(tree) => {
            tree.get(TYPE_KEY).and_then(TelemetryValue::as_str) == Some(CHOOSER_TYPE)
                || tree.contains_key("options")
                || tree.contains_key("selected")
        }
        _ => false,
    }
}

/// Severity band for progress bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Danger,
    Warning,
    Nominal,
}

impl Severity {
    pub fn css_class(self) -> &'static str {
        match self {
            Severity::Danger => "danger",
            Severity::Warning => "warning",
            Severity::Nominal => "nominal",
        }
    }
}

/// Normalize a progress value to a percentage in `[0, 100]`
///
/// Values in `[0, 1]` are treated as fractions.
pub fn normalize_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    let percent = if (0.0..=1.0).contains(&value) {
        value * 100.0
    } else {
        value
    };
    percent.clamp(0.0, 100.0)
}

/// `< 20` is danger, `< 50` warning, everything else nominal
pub fn severity(percent: f64) -> Severity {
    if percent < 20.0 {
        Severity::Danger
    } else if percent < 50.0 {
        Severity::Warning
    } else {
        Severity::Nominal
    }
}
