//! Flattening of prefix-subscription topic events into a telemetry tree
//!
//! A key/value store delivers `(value, "/SmartDashboard/Drive/speed")`
//! events. The subscription prefix is stripped and the remainder is split on
//! `/` to build nested subtrees.

use ort_core::value::{TelemetryTree, TelemetryValue};

pub const PATH_SEPARATOR: char = '/';

#[derive(Debug, Clone, Default)]
pub struct TopicTree {
    prefix: String,
    root: TelemetryTree,
}

impl TopicTree {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            root: TelemetryTree::new(),
        }
    }

    fn segments<'a>(&self, name: &'a str) -> Option<Vec<&'a str>> {
        let relative = name.strip_prefix(self.prefix.as_str())?;
        let segments: Vec<&str> = relative
            .split(PATH_SEPARATOR)
            .filter(|s| !s.is_empty())
            .collect();
        (!segments.is_empty()).then_some(segments)
    }

    /// Apply one subscription event. Topics outside the prefix are ignored.
    pub fn apply(&mut self, name: &str, value: TelemetryValue) -> bool {
        let Some(segments) = self.segments(name) else {
            return false;
        };
        let (leaf, parents) = match segments.split_last() {
            Some(split) => split,
            None => return false,
        };

        let mut node = &mut self.root;
        for segment in parents {
            let entry = node
                .entry((*segment).to_string())
                .or_insert_with(|| TelemetryValue::Tree(TelemetryTree::new()));
            // A leaf that gains children becomes a subtree
            if !matches!(entry, TelemetryValue::Tree(_)) {
                *entry = TelemetryValue::Tree(TelemetryTree::new());
            }
            node = match entry {
                TelemetryValue::Tree(child) => child,
                _ => return false,
            };
        }
        node.insert((*leaf).to_string(), value);
        true
    }

    /// Drop a topic that was unpublished
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(segments) = self.segments(name) else {
            return false;
        };
        let Some((leaf, parents)) = segments.split_last() else {
            return false;
        };

        let mut node = &mut self.root;
        for segment in parents {
            match node.get_mut(*segment) {
                Some(TelemetryValue::Tree(child)) => node = child,
                _ => return false,
            }
        }
        node.remove(*leaf).is_some()
    }

    pub fn snapshot(&self) -> TelemetryTree {
        self.root.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}
