//! Type-safe wrappers for physical units and display-unit inference
//!
//! Field-space quantities use newtype wrappers around f64 to prevent mixing
//! meters with radians. All unit types serialize with 4 decimal places to
//! keep JSON payloads compact.

use serde::{Deserialize, Serialize};

/// Round f64 to 4 decimal places for compact JSON serialization
fn round4<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 10000.0).round() / 10000.0)
}

/// Meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Meters(#[serde(serialize_with = "round4")] pub f64);

/// Radians
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Radians(#[serde(serialize_with = "round4")] pub f64);

impl Radians {
    pub fn to_degrees(self) -> f64 {
        self.0.to_degrees()
    }
}

/// Display unit inferred from a telemetry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayUnit {
    Volts,
    Amps,
    Celsius,
    MetersPerSecond,
    Degrees,
    Meters,
    Percent,
    Psi,
    None,
}

impl DisplayUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            DisplayUnit::Volts => "V",
            DisplayUnit::Amps => "A",
            DisplayUnit::Celsius => "°C",
            DisplayUnit::MetersPerSecond => "m/s",
            DisplayUnit::Degrees => "°",
            DisplayUnit::Meters => "m",
            DisplayUnit::Percent => "%",
            DisplayUnit::Psi => "PSI",
            DisplayUnit::None => "",
        }
    }
}

// First matching fragment wins.
const UNIT_TABLE: &[(&[&str], DisplayUnit)] = &[
    (&["voltage"], DisplayUnit::Volts),
    (&["current"], DisplayUnit::Amps),
    (&["temperature"], DisplayUnit::Celsius),
    (&["velocity", "speed"], DisplayUnit::MetersPerSecond),
    (&["angle", "rotation", "heading"], DisplayUnit::Degrees),
    (&["distance", "position"], DisplayUnit::Meters),
    (&["percent", "battery"], DisplayUnit::Percent),
    (&["pressure"], DisplayUnit::Psi),
];

/// Infer the display unit for a gauge from its key
pub fn unit_for_key(key: &str) -> DisplayUnit {
    let lower = key.to_lowercase();
    UNIT_TABLE
        .iter()
        .find(|(fragments, _)| fragments.iter().any(|f| lower.contains(f)))
        .map(|(_, unit)| *unit)
        .unwrap_or(DisplayUnit::None)
}
