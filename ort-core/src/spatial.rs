//! Spatial object detection and extraction
//!
//! Field data has no schema: a robot pose is any `[x, y, rotation?]` array
//! under a key that looks like a robot, a trajectory is an array of such
//! arrays, and so on. Detection and extraction both work from key-name
//! fragments evaluated in a fixed precedence.
//!
//! Coordinate system: field-space, origin at the blue alliance corner
//! - X: along the field length (meters)
//! - Y: along the field width (meters)
//! - rotation: counter-clockwise, radians

use crate::units::{Meters, Radians};
use crate::value::{TelemetryTree, TelemetryValue};
use crate::widget::TYPE_KEY;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Type tag published by WPILib field widgets
pub const FIELD_TYPE: &str = "Field2d";

pub const MIN_X: f64 = -2.0;
pub const MAX_X: f64 = 20.0;
pub const MIN_Y: f64 = -2.0;
pub const MAX_Y: f64 = 12.0;

const ROBOT_FRAGMENTS: &[&str] = &["robot"];
const ROBOT_EXACT: &[&str] = &["pose", "position"];
const TRAJECTORY_FRAGMENTS: &[&str] = &["trajectory", "path", "route"];
const GAME_PIECE_FRAGMENTS: &[&str] = &["note", "piece", "game", "coral", "algae", "cube", "cone"];
const TARGET_FRAGMENTS: &[&str] = &["target", "waypoint", "goal", "aim", "setpoint"];
const DETECTION_FRAGMENTS: &[&str] = &["robot", "trajectory", "path", "pose", "position"];

/// Real-world field size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldDimensions {
    pub length: Meters,
    pub width: Meters,
}

impl FieldDimensions {
    pub fn new(length: f64, width: f64) -> Self {
        Self {
            length: Meters(length),
            width: Meters(width),
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.length.0 / self.width.0
    }
}

impl Default for FieldDimensions {
    fn default() -> Self {
        Self::new(16.5354, 8.001)
    }
}

/// 2D position and heading in field-space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: Meters,
    pub y: Meters,
    pub rotation: Radians,
}

impl Pose {
    pub fn new(x: f64, y: f64, rotation: f64) -> Self {
        Self {
            x: Meters(x),
            y: Meters(y),
            rotation: Radians(rotation),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoseError {
    #[error("expected an array or object, got {0}")]
    Unsupported(&'static str),

    #[error("pose array needs at least 2 elements, got {0}")]
    TooShort(usize),

    #[error("pose coordinates must be numeric")]
    NonNumeric,

    #[error("pose ({x}, {y}) is outside the field bounds")]
    OutOfBounds { x: f64, y: f64 },
}

/// Parse `[x, y, rotation?]` or `{x, y, rotation?}` into a validated pose
pub fn parse_pose(value: &TelemetryValue) -> Result<Pose, PoseError> {
    let (x, y, rotation) = match value {
        TelemetryValue::Array(items) => {
            if items.len() < 2 {
                return Err(PoseError::TooShort(items.len()));
            }
            let x = items[0].as_f64().ok_or(PoseError::NonNumeric)?;
            let y = items[1].as_f64().ok_or(PoseError::NonNumeric)?;
            let rotation = items.get(2).and_then(TelemetryValue::as_f64).unwrap_or(0.0);
            (x, y, rotation)
        }
        TelemetryValue::Tree(tree) => {
            let x = tree.get("x").and_then(TelemetryValue::as_f64);
            let y = tree.get("y").and_then(TelemetryValue::as_f64);
            let (x, y) = x.zip(y).ok_or(PoseError::NonNumeric)?;
            let rotation = ["rotation", "heading", "theta"]
                .iter()
                .find_map(|k| tree.get(*k).and_then(TelemetryValue::as_f64))
                .unwrap_or(0.0);
            (x, y, rotation)
        }
        other => return Err(PoseError::Unsupported(other.kind())),
    };

    if !(MIN_X..=MAX_X).contains(&x) || !(MIN_Y..=MAX_Y).contains(&y) {
        return Err(PoseError::OutOfBounds { x, y });
    }
    let rotation = if rotation.is_finite() { rotation } else { 0.0 };
    Ok(Pose::new(x, y, rotation))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alliance {
    Blue,
    Red,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    pub name: String,
    pub pose: Pose,
    pub alliance: Alliance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub name: String,
    pub points: Vec<Pose>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePiece {
    pub name: String,
    pub pose: Pose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub pose: Pose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpatialObject {
    Robot(Robot),
    Trajectory(Trajectory),
    GamePiece(GamePiece),
    Target(Target),
}

/// Everything drawn on one field map, rebuilt on every pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldScene {
    pub robots: Vec<Robot>,
    pub trajectories: Vec<Trajectory>,
    pub game_pieces: Vec<GamePiece>,
    pub targets: Vec<Target>,
}

impl FieldScene {
    pub fn push(&mut self, object: SpatialObject) {
        match object {
            SpatialObject::Robot(r) => self.robots.push(r),
            SpatialObject::Trajectory(t) => self.trajectories.push(t),
            SpatialObject::GamePiece(g) => self.game_pieces.push(g),
            SpatialObject::Target(t) => self.targets.push(t),
        }
    }

    pub fn len(&self) -> usize {
        self.robots.len() + self.trajectories.len() + self.game_pieces.len() + self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_metadata(key: &str) -> bool {
    key.starts_with('.')
}

fn contains_any(haystack: &str, fragments: &[&str]) -> bool {
    fragments.iter().any(|f| haystack.contains(f))
}

fn looks_like_pose(value: &TelemetryValue) -> bool {
    match value.as_array() {
        Some(items) => items.len() >= 2 && items[0].is_number() && items[1].is_number(),
        None => false,
    }
}

fn looks_like_trajectory(value: &TelemetryValue) -> bool {
    match value.as_array().and_then(|items| items.first()) {
        Some(TelemetryValue::Array(first)) => first.len() >= 2,
        _ => false,
    }
}

/// Does this subtree carry field data?
pub fn is_field_like(tree: &TelemetryTree) -> bool {
    if tree.get(TYPE_KEY).and_then(TelemetryValue::as_str) == Some(FIELD_TYPE) {
        return true;
    }

    let spatial_key = tree.iter().any(|(key, value)| {
        !is_metadata(key)
            && contains_any(&key.to_lowercase(), DETECTION_FRAGMENTS)
            && (looks_like_pose(value) || looks_like_trajectory(value))
    });
    if spatial_key {
        return true;
    }

    ["Robot", "robot"].iter().any(|k| {
        tree.get(*k)
            .and_then(TelemetryValue::as_array)
            .is_some_and(|items| items.len() >= 2)
    })
}

/// The kind a key was routed to during extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Robot,
    Trajectory,
    GamePiece,
    Target,
    Fallback,
}

type RoutePredicate = fn(&str, &TelemetryValue) -> bool;

/// Extraction precedence; the first matching predicate claims the key
const ROUTES: &[(RoutePredicate, Route)] = &[
    (routes_to_robot, Route::Robot),
    (routes_to_trajectory, Route::Trajectory),
    (routes_to_game_piece, Route::GamePiece),
    (routes_to_target, Route::Target),
];

fn routes_to_robot(key: &str, _value: &TelemetryValue) -> bool {
    contains_any(key, ROBOT_FRAGMENTS) || ROBOT_EXACT.contains(&key)
}

fn routes_to_trajectory(key: &str, value: &TelemetryValue) -> bool {
    contains_any(key, TRAJECTORY_FRAGMENTS)
        && value.as_array().is_some_and(|items| !items.is_empty())
}

fn routes_to_game_piece(key: &str, _value: &TelemetryValue) -> bool {
    contains_any(key, GAME_PIECE_FRAGMENTS)
}

fn routes_to_target(key: &str, _value: &TelemetryValue) -> bool {
    contains_any(key, TARGET_FRAGMENTS)
}

fn route_for(lower_key: &str, value: &TelemetryValue) -> Route {
    ROUTES
        .iter()
        .find(|(predicate, _)| predicate(lower_key, value))
        .map(|(_, route)| *route)
        .unwrap_or(Route::Fallback)
}

/// Builds field scenes from subtrees that passed `is_field_like`
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialExtractor {
    field: FieldDimensions,
}

impl SpatialExtractor {
    pub fn new(field: FieldDimensions) -> Self {
        Self { field }
    }

    pub fn field(&self) -> FieldDimensions {
        self.field
    }

    pub fn extract(&self, tree: &TelemetryTree) -> FieldScene {
        let mut scene = FieldScene::default();

        for (key, value) in tree.iter().filter(|(k, _)| !is_metadata(k)) {
            let lower = key.to_lowercase();
            let object = match route_for(&lower, value) {
                Route::Robot => self.robot(key, &lower, value),
                Route::Trajectory => trajectory(key, value),
                Route::GamePiece => pose_object(key, value).map(|pose| {
                    SpatialObject::GamePiece(GamePiece { name: key.clone(), pose })
                }),
                Route::Target => pose_object(key, value).map(|pose| {
                    SpatialObject::Target(Target { name: key.clone(), pose })
                }),
                Route::Fallback => {
                    if looks_like_trajectory_head(value) {
                        trajectory(key, value)
                    } else if value.as_array().is_some_and(|items| items.len() >= 2) {
                        pose_object(key, value).map(|pose| {
                            SpatialObject::GamePiece(GamePiece { name: key.clone(), pose })
                        })
                    } else {
                        None
                    }
                }
            };

            if let Some(object) = object {
                scene.push(object);
            }
        }

        scene
    }

    fn robot(&self, key: &str, lower_key: &str, value: &TelemetryValue) -> Option<SpatialObject> {
        let pose = pose_object(key, value)?;
        Some(SpatialObject::Robot(Robot {
            name: key.to_string(),
            pose,
            alliance: self.alliance_for(lower_key, &pose),
        }))
    }

    /// Explicit `blue`/`red` in the key wins, otherwise the field half decides
    pub fn alliance_for(&self, lower_key: &str, pose: &Pose) -> Alliance {
        if lower_key.contains("blue") {
            Alliance::Blue
        } else if lower_key.contains("red") {
            Alliance::Red
        } else if pose.x.0 < self.field.length.0 / 2.0 {
            Alliance::Blue
        } else {
            Alliance::Red
        }
    }
}

fn looks_like_trajectory_head(value: &TelemetryValue) -> bool {
    matches!(
        value.as_array().and_then(|items| items.first()),
        Some(TelemetryValue::Array(_))
    )
}

fn pose_object(key: &str, value: &TelemetryValue) -> Option<Pose> {
    match parse_pose(value) {
        Ok(pose) => Some(pose),
        Err(e) => {
            debug!(key, error = %e, "dropping invalid pose");
            None
        }
    }
}

fn trajectory(key: &str, value: &TelemetryValue) -> Option<SpatialObject> {
    let items = value.as_array()?;
    let points: Vec<Pose> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match parse_pose(item) {
            Ok(pose) => Some(pose),
            Err(e) => {
                debug!(key, index = i, error = %e, "dropping trajectory point");
                None
            }
        })
        .collect();

    if points.is_empty() {
        debug!(key, "trajectory has no valid points");
        return None;
    }

    Some(SpatialObject::Trajectory(Trajectory {
        name: key.to_string(),
        points,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::tree_from_json;
    use serde_json::json;

    fn value(v: serde_json::Value) -> TelemetryValue {
        TelemetryValue::from_json(v).unwrap()
    }

    fn tree(v: serde_json::Value) -> TelemetryTree {
        tree_from_json(v).unwrap()
    }

    #[test]
    fn test_parse_pose_boundary_inclusive() {
        let pose = parse_pose(&value(json!([20, 12]))).unwrap();
        assert_eq!(pose.x, Meters(20.0));
        assert_eq!(pose.y, Meters(12.0));
        assert_eq!(pose.rotation, Radians(0.0));

        assert!(parse_pose(&value(json!([-2, -2]))).is_ok());
    }

    #[test]
    fn test_parse_pose_rejects_out_of_bounds() {
        assert_eq!(
            parse_pose(&value(json!([20.01, 0]))),
            Err(PoseError::OutOfBounds { x: 20.01, y: 0.0 })
        );
        assert!(parse_pose(&value(json!([0, 12.5]))).is_err());
        assert!(parse_pose(&TelemetryValue::Array(vec![
            TelemetryValue::Number(f64::NAN),
            TelemetryValue::Number(1.0),
        ]))
        .is_err());
    }

    #[test]
    fn test_parse_pose_rejects_non_numeric() {
        assert_eq!(
            parse_pose(&value(json!(["a", 1]))),
            Err(PoseError::NonNumeric)
        );
        assert_eq!(parse_pose(&value(json!([1]))), Err(PoseError::TooShort(1)));
        assert_eq!(
            parse_pose(&value(json!("1,2"))),
            Err(PoseError::Unsupported("string"))
        );
    }

    #[test]
    fn test_parse_pose_object_form() {
        let pose = parse_pose(&value(json!({ "x": 3, "y": 4, "heading": 1.5 }))).unwrap();
        assert_eq!(pose, Pose::new(3.0, 4.0, 1.5));
    }

    #[test]
    fn test_field_detection() {
        assert!(is_field_like(&tree(json!({ "Robot": [1.2, 3.4, 0.5] }))));
        assert!(!is_field_like(&tree(json!({ "voltage": 12.1 }))));
    }

    #[test]
    fn test_field_detection_variants() {
        assert!(is_field_like(&tree(json!({ ".type": "Field2d" }))));
        assert!(is_field_like(&tree(json!({ "autoPath": [[1, 2], [3, 4]] }))));
        assert!(is_field_like(&tree(json!({ "PosePosition": [1, 2] }))));
        // metadata keys never count
        assert!(!is_field_like(&tree(json!({ ".robot": [1, 2] }))));
        // single-element arrays are not poses
        assert!(!is_field_like(&tree(json!({ "pose": [1] }))));
        // non-numeric pose under a robot key still counts through the literal check
        assert!(is_field_like(&tree(json!({ "robot": ["a", "b"] }))));
        assert!(!is_field_like(&tree(json!({ "RobotName": "alpha" }))));
    }

    #[test]
    fn test_extract_robot_alliance() {
        let extractor = SpatialExtractor::default();
        let scene = extractor.extract(&tree(json!({
            "Robot": [2.0, 4.0, 0.0],
            "OpponentRobot": [14.0, 4.0, 3.14],
            "BlueRobot": [15.0, 1.0],
            "redRobot": [1.0, 1.0],
        })));

        assert_eq!(scene.robots.len(), 4);
        let alliance = |name: &str| {
            scene
                .robots
                .iter()
                .find(|r| r.name == name)
                .map(|r| r.alliance)
                .unwrap()
        };
        assert_eq!(alliance("Robot"), Alliance::Blue);
        assert_eq!(alliance("OpponentRobot"), Alliance::Red);
        assert_eq!(alliance("BlueRobot"), Alliance::Blue);
        assert_eq!(alliance("redRobot"), Alliance::Red);
    }

    #[test]
    fn test_extract_exact_pose_key() {
        let scene = SpatialExtractor::default().extract(&tree(json!({
            "pose": [3.0, 3.0],
            "position": [4.0, 3.0],
            "poseEstimate": [5.0, 3.0],
        })));
        assert_eq!(scene.robots.len(), 2);
        // "poseEstimate" is not an exact match; it falls back to a game piece
        assert_eq!(scene.game_pieces.len(), 1);
        assert_eq!(scene.game_pieces[0].name, "poseEstimate");
    }

    #[test]
    fn test_robot_branch_claims_key_even_when_invalid() {
        // "robotPath" matches the robot branch first and is never re-read as a trajectory
        let scene = SpatialExtractor::default().extract(&tree(json!({
            "robotPath": [[1, 1], [2, 2]],
        })));
        assert!(scene.is_empty());
    }

    #[test]
    fn test_extract_trajectory_drops_invalid_points() {
        let scene = SpatialExtractor::default().extract(&tree(json!({
            "trajectory": [[1, 1, 0], [50, 1], ["x", 2], [3, 3, 0.5]],
        })));
        assert_eq!(scene.trajectories.len(), 1);
        assert_eq!(
            scene.trajectories[0].points,
            vec![Pose::new(1.0, 1.0, 0.0), Pose::new(3.0, 3.0, 0.5)]
        );
    }

    #[test]
    fn test_all_invalid_trajectory_is_dropped() {
        let scene = SpatialExtractor::default().extract(&tree(json!({
            "route": [[99, 99], [-10, 0]],
        })));
        assert!(scene.trajectories.is_empty());
    }

    #[test]
    fn test_extract_pieces_and_targets() {
        let scene = SpatialExtractor::default().extract(&tree(json!({
            "Notes": [8.0, 4.0],
            "coralStation": [1.0, 7.0],
            "Target": [16.0, 5.5],
            "AimSetpoint": [15.0, 5.0, 1.0],
            ".type": "Field2d",
        })));
        assert_eq!(scene.game_pieces.len(), 2);
        assert_eq!(scene.targets.len(), 2);
        assert!(scene.robots.is_empty());
    }

    #[test]
    fn test_route_precedence() {
        let scene = SpatialExtractor::default().extract(&tree(json!({
            "notePath": [[1, 1], [2, 2]],
            "pieceTarget": [3, 3],
            "robotVoltage": [4, 4, 0],
            "aimGoal": [5, 5],
        })));

        let trajectories: Vec<&str> = scene.trajectories.iter().map(|t| t.name.as_str()).collect();
        let pieces: Vec<&str> = scene.game_pieces.iter().map(|p| p.name.as_str()).collect();
        let targets: Vec<&str> = scene.targets.iter().map(|t| t.name.as_str()).collect();
        let robots: Vec<&str> = scene.robots.iter().map(|r| r.name.as_str()).collect();

        assert_eq!(trajectories, vec!["notePath"]);
        assert_eq!(scene.trajectories[0].points.len(), 2);
        assert_eq!(pieces, vec!["pieceTarget"]);
        assert_eq!(targets, vec!["aimGoal"]);
        assert_eq!(robots, vec!["robotVoltage"]);

        // a path key needs pose-shaped rows to mark a field
        assert!(!is_field_like(&tree(json!({ "path": [[1]] }))));
    }

    #[test]
    fn test_fallback_rules() {
        let scene = SpatialExtractor::default().extract(&tree(json!({
            "Samples": [[1, 1], [2, 2]],
            "Thing": [4, 4],
            "Scalar": 3,
            "Single": [1],
        })));
        assert_eq!(scene.trajectories.len(), 1);
        assert_eq!(scene.trajectories[0].name, "Samples");
        assert_eq!(scene.game_pieces.len(), 1);
        assert_eq!(scene.game_pieces[0].name, "Thing");
    }

    #[test]
    fn test_path_key_without_array_is_not_a_trajectory() {
        let scene = SpatialExtractor::default().extract(&tree(json!({
            "pathName": "Auto1",
            "path": [],
        })));
        assert!(scene.is_empty());
    }

    #[test]
    fn test_alliance_uses_configured_field_length() {
        let extractor = SpatialExtractor::new(FieldDimensions::new(10.0, 5.0));
        let pose = Pose::new(6.0, 1.0, 0.0);
        assert_eq!(extractor.alliance_for("robot", &pose), Alliance::Red);
        assert_eq!(
            SpatialExtractor::default().alliance_for("robot", &pose),
            Alliance::Blue
        );
    }
}
