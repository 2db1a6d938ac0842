//! Schema-less telemetry value model
//!
//! Every poll delivers an arbitrarily nested key/value tree. `TelemetryValue`
//! is the tagged union the rest of the engine walks; `TelemetryTree` is an
//! ordered map so that comparison is independent of insertion order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;

/// A nested telemetry tree keyed by entry name
pub type TelemetryTree = BTreeMap<String, TelemetryValue>;

/// One telemetry value
#[derive(Debug, Clone)]
pub enum TelemetryValue {
    Null,
    Number(f64),
    Bool(bool),
    String(String),
    Array(Vec<TelemetryValue>),
    Tree(TelemetryTree),
}

#[derive(Debug, Error)]
pub enum ValueError {
    #[error("telemetry root must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("number {0} cannot be represented as f64")]
    UnrepresentableNumber(String),
}

impl TelemetryValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TelemetryValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TelemetryValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TelemetryValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[TelemetryValue]> {
        match self {
            TelemetryValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&TelemetryTree> {
        match self {
            TelemetryValue::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, TelemetryValue::Number(_))
    }

    /// Short name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryValue::Null => "null",
            TelemetryValue::Number(_) => "number",
            TelemetryValue::Bool(_) => "boolean",
            TelemetryValue::String(_) => "string",
            TelemetryValue::Array(_) => "array",
            TelemetryValue::Tree(_) => "tree",
        }
    }

    /// Human readable rendering for default rows
    pub fn display(&self) -> String {
        match self {
            TelemetryValue::Null => "null".to_string(),
            TelemetryValue::Number(n) => format_number(*n),
            TelemetryValue::Bool(b) => b.to_string(),
            TelemetryValue::String(s) => s.clone(),
            TelemetryValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.display()).collect();
                format!("[{}]", parts.join(", "))
            }
            TelemetryValue::Tree(tree) => format!("{{{} entries}}", tree.len()),
        }
    }

    /// Convert from a parsed JSON document
    pub fn from_json(value: serde_json::Value) -> Result<Self, ValueError> {
        Ok(match value {
            serde_json::Value::Null => TelemetryValue::Null,
            serde_json::Value::Bool(b) => TelemetryValue::Bool(b),
            serde_json::Value::Number(n) => TelemetryValue::Number(
                n.as_f64()
                    .ok_or_else(|| ValueError::UnrepresentableNumber(n.to_string()))?,
            ),
            serde_json::Value::String(s) => TelemetryValue::String(s),
            serde_json::Value::Array(items) => TelemetryValue::Array(
                items
                    .into_iter()
                    .map(TelemetryValue::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(map) => TelemetryValue::Tree(
                map.into_iter()
                    .map(|(k, v)| Ok((k, TelemetryValue::from_json(v)?)))
                    .collect::<Result<_, ValueError>>()?,
            ),
        })
    }

    /// Convert into a JSON document. Non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TelemetryValue::Null => serde_json::Value::Null,
            TelemetryValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            TelemetryValue::Bool(b) => serde_json::Value::Bool(*b),
            TelemetryValue::String(s) => serde_json::Value::String(s.clone()),
            TelemetryValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(TelemetryValue::to_json).collect())
            }
            TelemetryValue::Tree(tree) => tree_to_json(tree),
        }
    }
}

/// Parse a JSON document whose root must be an object
pub fn tree_from_json(value: serde_json::Value) -> Result<TelemetryTree, ValueError> {
    match TelemetryValue::from_json(value)? {
        TelemetryValue::Tree(tree) => Ok(tree),
        other => Err(ValueError::NotAnObject(other.kind())),
    }
}

pub fn tree_to_json(tree: &TelemetryTree) -> serde_json::Value {
    serde_json::Value::Object(
        tree.iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Look up a dotted path such as `Drivetrain.speed`
pub fn get_path<'a>(tree: &'a TelemetryTree, path: &str) -> Option<&'a TelemetryValue> {
    let mut parts = path.split('.');
    let mut current = tree.get(parts.next()?)?;
    for part in parts {
        current = current.as_tree()?.get(part)?;
    }
    Some(current)
}

/// Numbers render with up to three decimals, trailing zeros removed
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let s = format!("{:.3}", n);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

// Numbers compare by bit pattern so a NaN only equals an identical NaN.
impl PartialEq for TelemetryValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TelemetryValue::Null, TelemetryValue::Null) => true,
            (TelemetryValue::Number(a), TelemetryValue::Number(b)) => a.to_bits() == b.to_bits(),
            (TelemetryValue::Bool(a), TelemetryValue::Bool(b)) => a == b,
            (TelemetryValue::String(a), TelemetryValue::String(b)) => a == b,
            (TelemetryValue::Array(a), TelemetryValue::Array(b)) => a == b,
            (TelemetryValue::Tree(a), TelemetryValue::Tree(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TelemetryValue {}

impl From<f64> for TelemetryValue {
    fn from(n: f64) -> Self {
        TelemetryValue::Number(n)
    }
}

impl From<bool> for TelemetryValue {
    fn from(b: bool) -> Self {
        TelemetryValue::Bool(b)
    }
}

impl From<&str> for TelemetryValue {
    fn from(s: &str) -> Self {
        TelemetryValue::String(s.to_string())
    }
}

impl From<String> for TelemetryValue {
    fn from(s: String) -> Self {
        TelemetryValue::String(s)
    }
}

impl From<TelemetryTree> for TelemetryValue {
    fn from(tree: TelemetryTree) -> Self {
        TelemetryValue::Tree(tree)
    }
}

impl<T: Into<TelemetryValue>> From<Vec<T>> for TelemetryValue {
    fn from(items: Vec<T>) -> Self {
        TelemetryValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl Serialize for TelemetryValue {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(s)
    }
}

impl<'de> Deserialize<'de> for TelemetryValue {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(d)?;
        TelemetryValue::from_json(json).map_err(serde::de::Error::custom)
    }
}
