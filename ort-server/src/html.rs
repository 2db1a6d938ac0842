//! Server-rendered dashboard page
//!
//! Builds the whole page from a `DashboardView`: one card per category,
//! nested `<details>` blocks for subtrees, and an inline SVG for each field
//! map. The page reloads itself, so every refresh is a full rebuild.

use ort_core::canvas::escape_xml;
use ort_core::tree::{
    CategoryBody, CategoryView, ChooserView, DashboardView, SectionView, Subsection, SubsectionBody,
};
use ort_core::value::format_number;
use std::collections::HashMap;
use std::fmt::Write;

const REFRESH_SECONDS: u32 = 1;
const SPARKLINE_WIDTH: f64 = 120.0;
const SPARKLINE_HEIGHT: f64 = 28.0;

const STYLE: &str = r#"
body { background: #121212; color: #e0e0e0; font-family: system-ui, sans-serif; margin: 0; padding: 16px; }
header { display: flex; gap: 16px; align-items: baseline; margin-bottom: 16px; }
.status { padding: 2px 8px; border-radius: 4px; font-size: 0.85em; }
.status.connected { background: #1b5e20; }
.status.disconnected { background: #b71c1c; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(360px, 1fr)); gap: 16px; }
.card { background: #1e1e1e; border-radius: 8px; padding: 12px; }
.card.field { grid-column: 1 / -1; }
.card h2 { margin: 0 0 8px; font-size: 1.1em; }
.gauges { display: flex; flex-wrap: wrap; gap: 8px; }
.gauge { background: #2a2a2a; border-radius: 6px; padding: 6px 8px; min-width: 120px; }
.gauge .value { font-size: 1.4em; font-variant-numeric: tabular-nums; }
.gauge .unit { color: #9e9e9e; margin-left: 2px; }
.indicator { display: inline-flex; align-items: center; gap: 4px; margin: 2px 8px 2px 0; }
.indicator .dot { width: 10px; height: 10px; border-radius: 50%; background: #555; }
.indicator.on .dot { background: #3ddc84; }
.progress { margin: 4px 0; }
.progress .bar { background: #333; border-radius: 3px; height: 8px; }
.progress .fill { height: 8px; border-radius: 3px; }
.progress .fill.nominal { background: #3ddc84; }
.progress .fill.warning { background: #f5c542; }
.progress .fill.danger { background: #ff5252; }
table.rows { width: 100%; border-collapse: collapse; font-size: 0.9em; }
table.rows td { padding: 2px 4px; border-bottom: 1px solid #2a2a2a; }
table.rows td.key { color: #9e9e9e; }
details { margin: 6px 0 6px 8px; }
summary { cursor: pointer; color: #90caf9; }
ul.chooser { list-style: none; padding-left: 8px; margin: 4px 0; }
ul.chooser li.current { color: #f5c542; font-weight: bold; }
svg.field-map { width: 100%; height: auto; }
"#;

/// Render the full dashboard page
///
/// `field_svgs` maps a field category name to its rendered SVG document.
pub fn render_page(
    view: &DashboardView,
    field_svgs: &HashMap<String, String>,
    connected: bool,
    source: &str,
) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"{}\">\n\
         <title>OpenRobotTelemetry</title>\n<style>{}</style>\n</head>\n<body>\n",
        REFRESH_SECONDS, STYLE
    );

    let (class, label) = if connected {
        ("connected", "Connected")
    } else {
        ("disconnected", "Disconnected")
    };
    let _ = write!(
        html,
        "<header><h1>OpenRobotTelemetry</h1><span class=\"status {}\">{}</span><span>{}</span></header>\n",
        class,
        label,
        escape_xml(source)
    );

    html.push_str("<main class=\"grid\">\n");
    if !view.ungrouped.is_empty() {
        html.push_str("<section class=\"card\"><h2>General</h2>");
        write_section(&mut html, &view.ungrouped);
        html.push_str("</section>\n");
    }
    for category in &view.categories {
        write_category(&mut html, category, field_svgs);
    }
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn write_category(html: &mut String, category: &CategoryView, field_svgs: &HashMap<String, String>) {
    let name = escape_xml(&category.name);
    match &category.body {
        CategoryBody::Field { .. } => {
            let _ = write!(html, "<section class=\"card field\"><h2>{}</h2>", name);
            match field_svgs.get(&category.name) {
                Some(svg) => html.push_str(svg),
                None => html.push_str("<p>Field map unavailable</p>"),
            }
        }
        CategoryBody::Section { section } => {
            let _ = write!(html, "<section class=\"card\"><h2>{}</h2>", name);
            write_section(html, section);
        }
    }
    html.push_str("</section>\n");
}

fn write_section(html: &mut String, section: &SectionView) {
    if !section.gauges.is_empty() {
        html.push_str("<div class=\"gauges\">");
        for gauge in &section.gauges {
            let _ = write!(
                html,
                "<div class=\"gauge\" title=\"{}\"><div class=\"key\">{}</div>\
                 <span class=\"value\">{}</span><span class=\"unit\">{}</span>{}</div>",
                escape_xml(&gauge.path),
                escape_xml(&gauge.key),
                format_number(gauge.value),
                escape_xml(gauge.unit_symbol),
                sparkline(&gauge.history)
            );
        }
        html.push_str("</div>");
    }

    if !section.indicators.is_empty() {
        html.push_str("<div class=\"indicators\">");
        for indicator in &section.indicators {
            let _ = write!(
                html,
                "<span class=\"indicator{}\"><span class=\"dot\"></span>{}</span>",
                if indicator.on { " on" } else { "" },
                escape_xml(&indicator.key)
            );
        }
        html.push_str("</div>");
    }

    for bar in &section.progress_bars {
        let _ = write!(
            html,
            "<div class=\"progress\"><div class=\"key\">{} {}%</div><div class=\"bar\">\
             <div class=\"fill {}\" style=\"width: {:.1}%\"></div></div></div>",
            escape_xml(&bar.key),
            format_number(bar.percent.round()),
            bar.severity.css_class(),
            bar.percent
        );
    }

    if !section.rows.is_empty() {
        html.push_str("<table class=\"rows\">");
        for row in &section.rows {
            let _ = write!(
                html,
                "<tr><td class=\"key\">{}</td><td>{}</td></tr>",
                escape_xml(&row.key),
                escape_xml(&row.display)
            );
        }
        html.push_str("</table>");
    }

    for subsection in &section.subsections {
        write_subsection(html, subsection);
    }
}

fn write_subsection(html: &mut String, subsection: &Subsection) {
    let _ = write!(
        html,
        "<details{}><summary>{}</summary>",
        if subsection.expanded { " open" } else { "" },
        escape_xml(&subsection.name)
    );
    match &subsection.body {
        SubsectionBody::Chooser { chooser } => write_chooser(html, chooser),
        SubsectionBody::Section { section } => write_section(html, section),
    }
    html.push_str("</details>");
}

fn write_chooser(html: &mut String, chooser: &ChooserView) {
    let current = chooser.current();
    html.push_str("<ul class=\"chooser\">");
    for option in &chooser.options {
        let class = if Some(option.as_str()) == current {
            " class=\"current\""
        } else {
            ""
        };
        let _ = write!(html, "<li{}>{}</li>", class, escape_xml(option));
    }
    html.push_str("</ul>");
}

/// Inline polyline of recent values, scaled to their own range
fn sparkline(values: &[f64]) -> String {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return String::new();
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = if max > min { max - min } else { 1.0 };
    let step = SPARKLINE_WIDTH / (finite.len() - 1) as f64;

    let points: Vec<String> = finite
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let y = SPARKLINE_HEIGHT - (v - min) / span * SPARKLINE_HEIGHT;
            format!("{:.1},{:.1}", i as f64 * step, y)
        })
        .collect();

    format!(
        "<svg class=\"sparkline\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\
         <polyline fill=\"none\" stroke=\"#90caf9\" stroke-width=\"1.5\" points=\"{}\"/></svg>",
        points.join(" "),
        w = SPARKLINE_WIDTH,
        h = SPARKLINE_HEIGHT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ort_core::history::HistoryStore;
    use ort_core::tree::TreeRenderer;
    use ort_core::value::tree_from_json;
    use serde_json::json;

    fn page(data: serde_json::Value) -> String {
        let tree = tree_from_json(data).unwrap();
        let view = TreeRenderer::default().render(&tree, &HistoryStore::default());
        render_page(&view, &HashMap::new(), true, "Demo")
    }

    #[test]
    fn test_page_contains_cards_and_details() {
        let html = page(json!({
            "Drive": { "speed": 1.5, "Left": { "current": 20 } },
            "enabled": true
        }));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h2>Drive</h2>"));
        assert!(html.contains("<h2>General</h2>"));
        assert!(html.contains("<details open><summary>Left</summary>"));
        assert!(html.contains("Connected"));
    }

    #[test]
    fn test_text_is_escaped() {
        let html = page(json!({ "Arm": { "note": "<b>&</b>" } }));
        assert!(html.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
        assert!(!html.contains("<b>&</b>"));
    }

    #[test]
    fn test_chooser_marks_current_option() {
        let html = page(json!({
            "Auto": {
                "Mode": { ".type": "String Chooser", "options": ["A", "B"], "active": "B" }
            }
        }));
        assert!(html.contains("<li>A</li>"));
        assert!(html.contains("<li class=\"current\">B</li>"));
    }

    #[test]
    fn test_progress_bar_severity_class() {
        let html = page(json!({ "Power": { "batteryLevel": 0.3 } }));
        assert!(html.contains("fill warning"));
        assert!(html.contains("width: 30.0%"));
    }

    #[test]
    fn test_sparkline_needs_two_points() {
        assert!(sparkline(&[1.0]).is_empty());
        let svg = sparkline(&[1.0, 2.0, 3.0]);
        assert!(svg.contains("0.0,28.0"));
        assert!(svg.contains("120.0,0.0"));
    }
}
