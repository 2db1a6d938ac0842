//! Change gating between consecutive snapshots

use crate::value::TelemetryTree;

/// True unless both trees are structurally and value-wise identical
pub fn changed(new: &TelemetryTree, old: Option<&TelemetryTree>) -> bool {
    match old {
        Some(old) => new != old,
        None => true,
    }
}

/// Remembers the last accepted snapshot
#[derive(Debug, Default, Clone)]
pub struct ChangeDetector {
    last: Option<TelemetryTree>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `tree` if it differs from the previous snapshot
    ///
    /// Returns `false` (and keeps the previous snapshot) when nothing changed.
    pub fn accept(&mut self, tree: &TelemetryTree) -> bool {
        if !changed(tree, self.last.as_ref()) {
            return false;
        }
        self.last = Some(tree.clone());
        true
    }

    pub fn last(&self) -> Option<&TelemetryTree> {
        self.last.as_ref()
    }
}
