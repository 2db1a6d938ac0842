//! Drawing targets for field maps
//!
//! The renderer only talks to the `Canvas` trait. `DrawList` records the
//! calls (and serializes them for browser-side replay); `SvgCanvas` writes
//! an SVG document.

use serde::Serialize;
use std::fmt::Write;

/// A point in canvas (CSS pixel) space
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Style {
    pub fill: Option<&'static str>,
    pub stroke: Option<&'static str>,
    pub line_width: f64,
}

impl Style {
    pub fn fill(color: &'static str) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
            line_width: 0.0,
        }
    }

    pub fn stroke(color: &'static str, line_width: f64) -> Self {
        Self {
            fill: None,
            stroke: Some(color),
            line_width,
        }
    }

    pub fn with_stroke(mut self, color: &'static str, line_width: f64) -> Self {
        self.stroke = Some(color);
        self.line_width = line_width;
        self
    }
}

/// Draw layers, back to front
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Field,
    Trajectories,
    GamePieces,
    Targets,
    Robots,
}

impl Layer {
    pub fn name(self) -> &'static str {
        match self {
            Layer::Field => "field",
            Layer::Trajectories => "trajectories",
            Layer::GamePieces => "game-pieces",
            Layer::Targets => "targets",
            Layer::Robots => "robots",
        }
    }
}

/// Canvas size in CSS pixels plus the device pixel ratio of the backing store
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
}

impl CanvasSize {
    pub fn backing_width(&self) -> u32 {
        (self.width * self.pixel_ratio).round() as u32
    }

    pub fn backing_height(&self) -> u32 {
        (self.height * self.pixel_ratio).round() as u32
    }
}

pub trait Canvas {
    /// Start a new frame, discarding anything drawn before
    fn begin_frame(&mut self, size: CanvasSize, background: &'static str);

    fn begin_group(&mut self, layer: Layer, name: &str);
    fn end_group(&mut self);

    /// Translate then rotate (radians, clockwise on screen) until the matching pop
    fn push_transform(&mut self, origin: Point, angle: f64);
    fn pop_transform(&mut self);

    fn line(&mut self, from: Point, to: Point, style: Style);
    fn polyline(&mut self, points: &[Point], style: Style);
    fn polygon(&mut self, points: &[Point], style: Style);
    fn rect(&mut self, origin: Point, width: f64, height: f64, style: Style);
    fn circle(&mut self, center: Point, radius: f64, style: Style);
    fn text(&mut self, at: Point, text: &str, size: f64, color: &'static str);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    BeginFrame { size: CanvasSize, background: &'static str },
    BeginGroup { layer: Layer, name: String },
    EndGroup,
    PushTransform { origin: Point, angle: f64 },
    PopTransform,
    Line { from: Point, to: Point, style: Style },
    Polyline { points: Vec<Point>, style: Style },
    Polygon { points: Vec<Point>, style: Style },
    Rect { origin: Point, width: f64, height: f64, style: Style },
    Circle { center: Point, radius: f64, style: Style },
    Text { at: Point, text: String, size: f64, color: &'static str },
}

/// Recorded draw calls, in order
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers in the order their groups were opened
    pub fn group_layers(&self) -> Vec<(Layer, &str)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::BeginGroup { layer, name } => Some((*layer, name.as_str())),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for DrawList {
    fn begin_frame(&mut self, size: CanvasSize, background: &'static str) {
        self.commands.clear();
        self.commands.push(DrawCommand::BeginFrame { size, background });
    }

    fn begin_group(&mut self, layer: Layer, name: &str) {
        self.commands.push(DrawCommand::BeginGroup {
            layer,
            name: name.to_string(),
        });
    }

    fn end_group(&mut self) {
        self.commands.push(DrawCommand::EndGroup);
    }

    fn push_transform(&mut self, origin: Point, angle: f64) {
        self.commands.push(DrawCommand::PushTransform { origin, angle });
    }

    fn pop_transform(&mut self) {
        self.commands.push(DrawCommand::PopTransform);
    }

    fn line(&mut self, from: Point, to: Point, style: Style) {
        self.commands.push(DrawCommand::Line { from, to, style });
    }

    fn polyline(&mut self, points: &[Point], style: Style) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            style,
        });
    }

    fn polygon(&mut self, points: &[Point], style: Style) {
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            style,
        });
    }

    fn rect(&mut self, origin: Point, width: f64, height: f64, style: Style) {
        self.commands.push(DrawCommand::Rect {
            origin,
            width,
            height,
            style,
        });
    }

    fn circle(&mut self, center: Point, radius: f64, style: Style) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            style,
        });
    }

    fn text(&mut self, at: Point, text: &str, size: f64, color: &'static str) {
        self.commands.push(DrawCommand::Text {
            at,
            text: text.to_string(),
            size,
            color,
        });
    }
}

/// SVG document writer
#[derive(Debug, Clone, Default)]
pub struct SvgCanvas {
    header: String,
    body: String,
}

impl SvgCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        format!("{}{}</svg>", self.header, self.body)
    }
}

fn style_attrs(style: &Style) -> String {
    let mut attrs = String::new();
    let _ = write!(attrs, " fill=\"{}\"", style.fill.unwrap_or("none"));
    if let Some(stroke) = style.stroke {
        let _ = write!(
            attrs,
            " stroke=\"{}\" stroke-width=\"{:.2}\"",
            stroke, style.line_width
        );
    }
    attrs
}

fn points_attr(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{:.2},{:.2}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape text for element content and attribute values
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

impl Canvas for SvgCanvas {
    fn begin_frame(&mut self, size: CanvasSize, background: &'static str) {
        self.body.clear();
        self.header = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.2} {h:.2}\">\
             <rect x=\"0\" y=\"0\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"{bg}\"/>",
            w = size.width,
            h = size.height,
            bg = background,
        );
    }

    fn begin_group(&mut self, layer: Layer, name: &str) {
        let _ = write!(
            self.body,
            "<g class=\"{}\" data-name=\"{}\">",
            layer.name(),
            escape_xml(name)
        );
    }

    fn end_group(&mut self) {
        self.body.push_str("</g>");
    }

    fn push_transform(&mut self, origin: Point, angle: f64) {
        let _ = write!(
            self.body,
            "<g transform=\"translate({:.2} {:.2}) rotate({:.2})\">",
            origin.x,
            origin.y,
            angle.to_degrees()
        );
    }

    fn pop_transform(&mut self) {
        self.body.push_str("</g>");
    }

    fn line(&mut self, from: Point, to: Point, style: Style) {
        let _ = write!(
            self.body,
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\"{}/>",
            from.x,
            from.y,
            to.x,
            to.y,
            style_attrs(&style)
        );
    }

    fn polyline(&mut self, points: &[Point], style: Style) {
        let _ = write!(
            self.body,
            "<polyline points=\"{}\"{}/>",
            points_attr(points),
            style_attrs(&style)
        );
    }

    fn polygon(&mut self, points: &[Point], style: Style) {
        let _ = write!(
            self.body,
            "<polygon points=\"{}\"{}/>",
            points_attr(points),
            style_attrs(&style)
        );
    }

    fn rect(&mut self, origin: Point, width: f64, height: f64, style: Style) {
        let _ = write!(
            self.body,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\"{}/>",
            origin.x,
            origin.y,
            width,
            height,
            style_attrs(&style)
        );
    }

    fn circle(&mut self, center: Point, radius: f64, style: Style) {
        let _ = write!(
            self.body,
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\"{}/>",
            center.x,
            center.y,
            radius,
            style_attrs(&style)
        );
    }

    fn text(&mut self, at: Point, text: &str, size: f64, color: &'static str) {
        let _ = write!(
            self.body,
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{:.1}\" fill=\"{}\" text-anchor=\"middle\">{}</text>",
            at.x,
            at.y,
            size,
            color,
            escape_xml(text)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size() -> CanvasSize {
        CanvasSize {
            width: 200.0,
            height: 100.0,
            pixel_ratio: 2.0,
        }
    }

    #[test]
    fn test_backing_store_scaled_by_pixel_ratio() {
        assert_eq!(size().backing_width(), 400);
        assert_eq!(size().backing_height(), 200);
    }

    #[test]
    fn test_draw_list_begin_frame_resets() {
        let mut list = DrawList::new();
        list.begin_frame(size(), "#000");
        list.circle(Point::new(1.0, 1.0), 2.0, Style::fill("#fff"));
        list.begin_frame(size(), "#000");
        assert_eq!(list.commands.len(), 1);
    }

    #[test]
    fn test_svg_output_is_escaped_and_closed() {
        let mut svg = SvgCanvas::new();
        svg.begin_frame(size(), "#101010");
        svg.begin_group(Layer::Robots, "a<b>");
        svg.text(Point::new(0.0, 0.0), "x & y", 10.0, "#fff");
        svg.end_group();
        let doc = svg.finish();

        assert!(doc.starts_with("<svg"));
        assert!(doc.ends_with("</svg>"));
        assert!(doc.contains("data-name=\"a&lt;b&gt;\""));
        assert!(doc.contains("x &amp; y"));
        assert!(doc.contains("class=\"robots\""));
    }
}
