//! Dashboard view composition
//!
//! Turns a sanitized telemetry tree into a `DashboardView`: one card per
//! top-level category, each either a field map or a recursive section of
//! grouped widgets. The view is rebuilt from scratch on every pass.

use crate::history::HistoryStore;
use crate::spatial::{is_field_like, FieldScene, SpatialExtractor};
use crate::units::{unit_for_key, DisplayUnit};
use crate::value::{TelemetryTree, TelemetryValue};
use crate::widget::{classify, is_chooser, normalize_percent, severity, Severity, WidgetKind};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    /// Leaves that sit directly at the root, outside any category
    pub ungrouped: SectionView,
    pub categories: Vec<CategoryView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub name: String,
    #[serde(flatten)]
    pub body: CategoryBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryBody {
    Field { scene: FieldScene },
    Section { section: SectionView },
}

impl CategoryView {
    pub fn is_field(&self) -> bool {
        matches!(self.body, CategoryBody::Field { .. })
    }
}

/// Widgets of one tree level, grouped by kind
#[derive(Debug, Clone, Default, Serialize)]
pub struct SectionView {
    pub depth: usize,
    pub gauges: Vec<Gauge>,
    pub indicators: Vec<Indicator>,
    pub progress_bars: Vec<ProgressBar>,
    pub rows: Vec<Row>,
    pub subsections: Vec<Subsection>,
}

impl SectionView {
    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
            && self.indicators.is_empty()
            && self.progress_bars.is_empty()
            && self.rows.is_empty()
            && self.subsections.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Gauge {
    pub key: String,
    pub path: String,
    pub value: f64,
    pub unit: DisplayUnit,
    pub unit_symbol: &'static str,
    /// Recent values for this path, oldest first
    pub history: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Indicator {
    pub key: String,
    pub path: String,
    pub on: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressBar {
    pub key: String,
    pub path: String,
    pub raw: f64,
    pub percent: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize)]
pub struct Row {
    pub key: String,
    pub path: String,
    pub display: String,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Subsection {
    pub name: String,
    pub path: String,
    pub expanded: bool,
    #[serde(flatten)]
    pub body: SubsectionBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubsectionBody {
    Chooser { chooser: ChooserView },
    Section { section: SectionView },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChooserView {
    pub options: Vec<String>,
    pub selected: Option<String>,
    pub active: Option<String>,
    pub default: Option<String>,
}

impl ChooserView {
    pub fn from_tree(tree: &TelemetryTree) -> Self {
        let text = |key: &str| tree.get(key).and_then(TelemetryValue::as_str).map(str::to_string);
        let options = tree
            .get("options")
            .and_then(TelemetryValue::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(TelemetryValue::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            options,
            selected: text("selected"),
            active: text("active"),
            default: text("default"),
        }
    }

    /// The option to highlight: active, then selected, then default
    pub fn current(&self) -> Option<&str> {
        self.active
            .as_deref()
            .or(self.selected.as_deref())
            .or(self.default.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeRenderer {
    extractor: SpatialExtractor,
}

impl TreeRenderer {
    pub fn new(extractor: SpatialExtractor) -> Self {
        Self { extractor }
    }

    pub fn render(&self, tree: &TelemetryTree, history: &HistoryStore) -> DashboardView {
        let mut view = DashboardView::default();
        let mut categories: Vec<(bool, &String, &TelemetryTree)> = Vec::new();
        let mut ungrouped = TelemetryTree::new();

        for (key, value) in tree {
            match value {
                TelemetryValue::Tree(child) if !is_chooser(value) => {
                    categories.push((is_field_like(child), key, child));
                }
                other => {
                    ungrouped.insert(key.clone(), other.clone());
                }
            }
        }

        // Field categories first, then by name
        categories.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        view.ungrouped = self.section(&ungrouped, "", 0, history);
        view.categories = categories
            .into_iter()
            .map(|(field, name, child)| CategoryView {
                name: name.clone(),
                body: if field {
                    CategoryBody::Field {
                        scene: self.extractor.extract(child),
                    }
                } else {
                    CategoryBody::Section {
                        section: self.section(child, name, 0, history),
                    }
                },
            })
            .collect();

        view
    }

    fn section(
        &self,
        tree: &TelemetryTree,
        prefix: &str,
        depth: usize,
        history: &HistoryStore,
    ) -> SectionView {
        let mut section = SectionView {
            depth,
            ..Default::default()
        };

        for (key, value) in tree {
            if key.starts_with('.') {
                continue;
            }
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };

            if let TelemetryValue::Tree(child) = value {
                let body = if classify(key, value) == WidgetKind::Chooser {
                    SubsectionBody::Chooser {
                        chooser: ChooserView::from_tree(child),
                    }
                } else {
                    SubsectionBody::Section {
                        section: self.section(child, &path, depth + 1, history),
                    }
                };
                section.subsections.push(Subsection {
                    name: key.clone(),
                    path,
                    expanded: true,
                    body,
                });
                continue;
            }

            match (classify(key, value), value) {
                (WidgetKind::BooleanIndicator, TelemetryValue::Bool(on)) => {
                    section.indicators.push(Indicator {
                        key: key.clone(),
                        path,
                        on: *on,
                    });
                }
                (WidgetKind::ProgressBar, TelemetryValue::Number(n)) => {
                    let percent = normalize_percent(*n);
                    section.progress_bars.push(ProgressBar {
                        key: key.clone(),
                        path,
                        raw: *n,
                        percent,
                        severity: severity(percent),
                    });
                }
                (WidgetKind::NumberGauge, TelemetryValue::Number(n)) => {
                    let unit = unit_for_key(key);
                    section.gauges.push(Gauge {
                        key: key.clone(),
                        history: history.values(&path),
                        path,
                        value: *n,
                        unit,
                        unit_symbol: unit.symbol(),
                    });
                }
                _ => {
                    section.rows.push(Row {
                        key: key.clone(),
                        path,
                        display: value.display(),
                        depth,
                    });
                }
            }
        }

        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::tree_from_json;
    use chrono::Utc;
    use serde_json::json;

    fn tree(v: serde_json::Value) -> TelemetryTree {
        tree_from_json(v).unwrap()
    }

    #[test]
    fn test_field_categories_sort_first() {
        let data = tree(json!({
            "Arm": { "angle": 30 },
            "Zeta": { "Robot": [1, 1, 0] },
            "Drive": { "speed": 1 },
            "Alpha": { "pose": [2, 2] },
        }));
        let view = TreeRenderer::default().render(&data, &HistoryStore::default());
        let names: Vec<&str> = view.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta", "Arm", "Drive"]);
        assert!(view.categories[0].is_field());
        assert!(view.categories[1].is_field());
        assert!(!view.categories[2].is_field());
    }

    #[test]
    fn test_leaves_grouped_by_kind() {
        let data = tree(json!({
            "Drive": {
                "speed": 2.5,
                "enabled": true,
                "batteryLevel": 0.15,
                "mode": "teleop",
                "gear": 2,
                "Left": { "current": 40 }
            }
        }));
        let mut history = HistoryStore::default();
        history.observe_tree(&data, Utc::now());

        let view = TreeRenderer::default().render(&data, &history);
        let CategoryBody::Section { section } = &view.categories[0].body else {
            panic!("expected a section");
        };

        assert_eq!(section.depth, 0);
        assert_eq!(section.gauges.len(), 1);
        assert_eq!(section.gauges[0].path, "Drive.speed");
        assert_eq!(section.gauges[0].unit_symbol, "m/s");
        assert_eq!(section.gauges[0].history, vec![2.5]);

        assert_eq!(section.indicators.len(), 1);
        assert!(section.indicators[0].on);

        assert_eq!(section.progress_bars.len(), 1);
        assert_eq!(section.progress_bars[0].percent, 15.0);
        assert_eq!(section.progress_bars[0].severity, Severity::Danger);

        let rows: Vec<&str> = section.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(rows, vec!["gear", "mode"]);

        assert_eq!(section.subsections.len(), 1);
        let sub = &section.subsections[0];
        assert!(sub.expanded);
        assert_eq!(sub.path, "Drive.Left");
        let SubsectionBody::Section { section: inner } = &sub.body else {
            panic!("expected nested section");
        };
        assert_eq!(inner.depth, 1);
        assert_eq!(inner.gauges[0].path, "Drive.Left.current");
    }

    #[test]
    fn test_chooser_subsection() {
        let data = tree(json!({
            "SmartDashboard": {
                "Auto": {
                    ".type": "String Chooser",
                    "options": ["Left", "Right"],
                    "default": "Left",
                    "active": "Right"
                }
            }
        }));
        let view = TreeRenderer::default().render(&data, &HistoryStore::default());
        let CategoryBody::Section { section } = &view.categories[0].body else {
            panic!("expected a section");
        };
        let SubsectionBody::Chooser { chooser } = &section.subsections[0].body else {
            panic!("expected a chooser");
        };
        assert_eq!(chooser.options, vec!["Left", "Right"]);
        assert_eq!(chooser.current(), Some("Right"));
    }

    #[test]
    fn test_root_leaves_are_ungrouped() {
        let data = tree(json!({ "matchTime": 93, "enabled": false, "Drive": { "x": 1 } }));
        let view = TreeRenderer::default().render(&data, &HistoryStore::default());
        assert_eq!(view.categories.len(), 1);
        assert_eq!(view.ungrouped.indicators.len(), 1);
        assert_eq!(view.ungrouped.rows.len(), 1);
    }

    #[test]
    fn test_field_category_extracts_scene() {
        let data = tree(json!({
            "Field": {
                ".type": "Field2d",
                "Robot": [3, 3, 0],
                "trajectory": [[1, 1], [2, 2]]
            }
        }));
        let view = TreeRenderer::default().render(&data, &HistoryStore::default());
        let CategoryBody::Field { scene } = &view.categories[0].body else {
            panic!("expected a field");
        };
        assert_eq!(scene.robots.len(), 1);
        assert_eq!(scene.trajectories.len(), 1);
    }

    #[test]
    fn test_metadata_keys_not_rendered() {
        let data = tree(json!({ "Arm": { ".name": "Arm", "angle": 10 } }));
        let view = TreeRenderer::default().render(&data, &HistoryStore::default());
        let CategoryBody::Section { section } = &view.categories[0].body else {
            panic!("expected a section");
        };
        assert!(section.rows.is_empty());
        assert_eq!(section.gauges.len(), 1);
    }
}
