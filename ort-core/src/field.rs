//! Field map rendering
//!
//! Projects field-space poses into a canvas that preserves the field's
//! aspect ratio, then draws the scene layer by layer: field, trajectories,
//! game pieces, targets, robots. Robots always go last so nothing planned
//! or static hides them.

use crate::canvas::{Canvas, CanvasSize, Layer, Point, Style};
use crate::spatial::{Alliance, FieldDimensions, FieldScene, GamePiece, Pose, Robot, Target, Trajectory};

pub const DEFAULT_MAX_HEIGHT: f64 = 600.0;
/// Widest canvas a view will lay out, in CSS pixels
pub const MAX_CANVAS_WIDTH: f64 = 8192.0;

/// Robot frame including bumpers (meters)
const ROBOT_SIZE: f64 = 0.9;
const BUMPER_WIDTH: f64 = 0.08;
const GAME_PIECE_RADIUS: f64 = 0.18;
const TARGET_RADIUS: f64 = 0.25;
/// Waypoint markers shown on a trajectory before decimation kicks in
const MAX_WAYPOINT_MARKERS: usize = 15;

const BACKGROUND: &str = "#1e1e1e";
const CARPET: &str = "#2d3b2d";
const GRID: &str = "#3f513f";
const BORDER: &str = "#d0d0d0";
const MIDLINE: &str = "#8a8a8a";
const TRAJECTORY: &str = "#f5c542";
const WAYPOINT: &str = "#f5e6a8";
const START_MARKER: &str = "#3ddc84";
const END_MARKER: &str = "#ff6e40";
const GAME_PIECE: &str = "#ff9f1c";
const TARGET: &str = "#e040fb";
const ROBOT_BODY: &str = "#303030";
const LABEL: &str = "#f0f0f0";

struct AlliancePalette {
    bumper: &'static str,
    fill: &'static str,
}

fn palette(alliance: Alliance) -> AlliancePalette {
    match alliance {
        Alliance::Blue => AlliancePalette {
            bumper: "#1e63ff",
            fill: "#9db8ff",
        },
        Alliance::Red => AlliancePalette {
            bumper: "#ff2b2b",
            fill: "#ffa3a3",
        },
    }
}

/// Field-to-canvas projection for one canvas size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldLayout {
    pub field: FieldDimensions,
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl FieldLayout {
    /// Fit the field inside `width` x `height`, centered, never clipped
    pub fn fit(field: FieldDimensions, width: f64, height: f64) -> Self {
        let scale_x = width / field.length.0;
        let scale_y = height / field.width.0;
        let scale = scale_x.min(scale_y).max(0.0);
        Self {
            field,
            scale,
            offset_x: (width - field.length.0 * scale) / 2.0,
            offset_y: (height - field.width.0 * scale) / 2.0,
        }
    }

    /// Canvas Y grows downwards, field Y grows upwards
    pub fn to_canvas(&self, x: f64, y: f64) -> Point {
        Point::new(
            self.offset_x + x * self.scale,
            self.offset_y + (self.field.width.0 - y) * self.scale,
        )
    }

    pub fn pose_to_canvas(&self, pose: &Pose) -> Point {
        self.to_canvas(pose.x.0, pose.y.0)
    }

    pub fn meters(&self, m: f64) -> f64 {
        m * self.scale
    }
}

/// Waypoint marker spacing for a trajectory of `point_count` poses
pub fn waypoint_interval(point_count: usize) -> usize {
    (point_count / MAX_WAYPOINT_MARKERS).max(1)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRenderer {
    field: FieldDimensions,
}

impl FieldRenderer {
    pub fn new(field: FieldDimensions) -> Self {
        Self { field }
    }

    pub fn field(&self) -> FieldDimensions {
        self.field
    }

    pub fn render(&self, scene: &FieldScene, size: CanvasSize, canvas: &mut dyn Canvas) {
        let layout = FieldLayout::fit(self.field, size.width, size.height);
        canvas.begin_frame(size, BACKGROUND);

        self.draw_field(&layout, canvas);
        for trajectory in &scene.trajectories {
            draw_trajectory(&layout, trajectory, canvas);
        }
        for piece in &scene.game_pieces {
            draw_game_piece(&layout, piece, canvas);
        }
        for target in &scene.targets {
            draw_target(&layout, target, canvas);
        }
        for robot in &scene.robots {
            draw_robot(&layout, robot, canvas);
        }
    }

    fn draw_field(&self, layout: &FieldLayout, canvas: &mut dyn Canvas) {
        let length = self.field.length.0;
        let width = self.field.width.0;
        canvas.begin_group(Layer::Field, "field");

        let origin = layout.to_canvas(0.0, width);
        canvas.rect(
            origin,
            layout.meters(length),
            layout.meters(width),
            Style::fill(CARPET),
        );

        let grid = Style::stroke(GRID, 1.0);
        let mut x = 1.0;
        while x < length {
            canvas.line(layout.to_canvas(x, 0.0), layout.to_canvas(x, width), grid);
            x += 1.0;
        }
        let mut y = 1.0;
        while y < width {
            canvas.line(layout.to_canvas(0.0, y), layout.to_canvas(length, y), grid);
            y += 1.0;
        }

        canvas.line(
            layout.to_canvas(length / 2.0, 0.0),
            layout.to_canvas(length / 2.0, width),
            Style::stroke(MIDLINE, 2.0),
        );
        canvas.rect(
            origin,
            layout.meters(length),
            layout.meters(width),
            Style::stroke(BORDER, 2.0),
        );
        canvas.end_group();
    }
}

fn draw_trajectory(layout: &FieldLayout, trajectory: &Trajectory, canvas: &mut dyn Canvas) {
    let points: Vec<Point> = trajectory
        .points
        .iter()
        .map(|p| layout.pose_to_canvas(p))
        .collect();
    let Some((first, last)) = points.first().zip(points.last()) else {
        return;
    };

    canvas.begin_group(Layer::Trajectories, &trajectory.name);
    canvas.polyline(&points, Style::stroke(TRAJECTORY, 2.0));

    let interval = waypoint_interval(points.len());
    let marker = Style::fill(WAYPOINT);
    let last_index = points.len() - 1;
    for (i, point) in points.iter().enumerate().step_by(interval) {
        // endpoints get their own markers below
        if i == 0 || i == last_index {
            continue;
        }
        canvas.circle(*point, 2.5, marker);
    }

    canvas.circle(*first, 5.0, Style::fill(START_MARKER).with_stroke(LABEL, 1.0));
    if points.len() > 1 {
        canvas.circle(*last, 5.0, Style::fill(END_MARKER).with_stroke(LABEL, 1.0));
    }
    canvas.end_group();
}

fn draw_game_piece(layout: &FieldLayout, piece: &GamePiece, canvas: &mut dyn Canvas) {
    canvas.begin_group(Layer::GamePieces, &piece.name);
    canvas.circle(
        layout.pose_to_canvas(&piece.pose),
        layout.meters(GAME_PIECE_RADIUS).max(3.0),
        Style::fill(GAME_PIECE).with_stroke(BACKGROUND, 1.0),
    );
    canvas.end_group();
}

fn draw_target(layout: &FieldLayout, target: &Target, canvas: &mut dyn Canvas) {
    let center = layout.pose_to_canvas(&target.pose);
    let r = layout.meters(TARGET_RADIUS).max(4.0);
    let style = Style::stroke(TARGET, 2.0);

    canvas.begin_group(Layer::Targets, &target.name);
    canvas.circle(center, r, style);
    canvas.line(
        Point::new(center.x - r * 1.4, center.y),
        Point::new(center.x + r * 1.4, center.y),
        style,
    );
    canvas.line(
        Point::new(center.x, center.y - r * 1.4),
        Point::new(center.x, center.y + r * 1.4),
        style,
    );
    canvas.end_group();
}

fn draw_robot(layout: &FieldLayout, robot: &Robot, canvas: &mut dyn Canvas) {
    let center = layout.pose_to_canvas(&robot.pose);
    let size = layout.meters(ROBOT_SIZE);
    let bumper = layout.meters(BUMPER_WIDTH).max(1.0);
    let half = size / 2.0;
    let colors = palette(robot.alliance);

    canvas.begin_group(Layer::Robots, &robot.name);
    // Canvas Y is flipped, so a counter-clockwise field heading is clockwise-negative here.
    canvas.push_transform(center, -robot.pose.rotation.0);

    canvas.rect(Point::new(-half, -half), size, size, Style::fill(ROBOT_BODY));
    canvas.rect(
        Point::new(-half + bumper / 2.0, -half + bumper / 2.0),
        size - bumper,
        size - bumper,
        Style::stroke(colors.bumper, bumper),
    );
    canvas.polygon(
        &[
            Point::new(half * 0.8, 0.0),
            Point::new(half * 0.1, -half * 0.45),
            Point::new(half * 0.1, half * 0.45),
        ],
        Style::fill(colors.fill),
    );

    canvas.pop_transform();
    canvas.text(
        Point::new(center.x, center.y - half - 4.0),
        &robot.name,
        11.0,
        LABEL,
    );
    canvas.end_group();
}

/// Per-canvas cache of the last scene and size
///
/// Data updates call `set_scene`; layout changes call `resize`. Either way
/// the next `redraw` draws the full scene from scratch.
#[derive(Debug, Clone)]
pub struct FieldView {
    renderer: FieldRenderer,
    max_height: f64,
    scene: FieldScene,
    size: Option<CanvasSize>,
}

impl FieldView {
    pub fn new(field: FieldDimensions, max_height: f64) -> Self {
        Self {
            renderer: FieldRenderer::new(field),
            max_height,
            scene: FieldScene::default(),
            size: None,
        }
    }

    pub fn scene(&self) -> &FieldScene {
        &self.scene
    }

    pub fn size(&self) -> Option<CanvasSize> {
        self.size
    }

    pub fn set_scene(&mut self, scene: FieldScene) {
        self.scene = scene;
    }

    /// Track the container width; height follows the field aspect ratio up to `max_height`
    pub fn resize(&mut self, container_width: f64, pixel_ratio: f64) -> CanvasSize {
        let width = if container_width.is_nan() {
            1.0
        } else {
            container_width.clamp(1.0, MAX_CANVAS_WIDTH)
        };
        let aspect = self.renderer.field().aspect_ratio();
        let height = (width / aspect).min(self.max_height);
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        let size = CanvasSize {
            width,
            height,
            pixel_ratio,
        };
        self.size = Some(size);
        size
    }

    /// Draw the cached scene; false until the first `resize`
    pub fn redraw(&self, canvas: &mut dyn Canvas) -> bool {
        match self.size {
            Some(size) => {
                self.renderer.render(&self.scene, size, canvas);
                true
            }
            None => false,
        }
    }
}
