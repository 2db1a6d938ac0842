//! Demo source that generates synthetic robot telemetry for testing
//!
//! Simulates a robot driving laps around the field while publishing
//! SmartDashboard-style topics: drivetrain, power, pneumatics, an arm, an
//! auto chooser and a Field2d widget with pose, planned path, game pieces
//! and a target. Swerve module and PathPlanner topics are published too, so
//! the dashboard's sanitizer has something to strip.

use crate::topics::TopicTree;
use anyhow::Result;
use async_trait::async_trait;
use ort_core::spatial::FieldDimensions;
use ort_core::value::{TelemetryTree, TelemetryValue};
use ort_core::TelemetrySource;
use std::f64::consts::TAU;
use std::sync::Mutex;
use std::time::Instant;

pub const DEMO_PREFIX: &str = "/SmartDashboard/";

/// Seconds per lap around the field
const LAP_DURATION: f64 = 20.0;
/// Points in the published planned path
const PATH_POINTS: usize = 60;

// =============================================================================
// Lap geometry: an ellipse around the field center
// =============================================================================

#[derive(Clone, Copy)]
struct Lap {
    center_x: f64,
    center_y: f64,
    radius_x: f64,
    radius_y: f64,
}

impl Lap {
    fn for_field(field: FieldDimensions) -> Self {
        Self {
            center_x: field.length.0 / 2.0,
            center_y: field.width.0 / 2.0,
            radius_x: field.length.0 * 0.33,
            radius_y: field.width.0 * 0.3,
        }
    }

    /// Pose at phase `theta`, heading along the direction of travel
    fn pose(&self, theta: f64) -> [f64; 3] {
        let x = self.center_x + self.radius_x * theta.cos();
        let y = self.center_y + self.radius_y * theta.sin();
        let heading = (self.radius_y * theta.cos()).atan2(-self.radius_x * theta.sin());
        [x, y, heading]
    }

    /// Ground speed in m/s at phase `theta`
    fn speed(&self, theta: f64) -> f64 {
        let omega = TAU / LAP_DURATION;
        let dx = self.radius_x * theta.sin();
        let dy = self.radius_y * theta.cos();
        (dx * dx + dy * dy).sqrt() * omega
    }
}

/// Simple deterministic noise from a seed
fn noise(seed: f64) -> f64 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

/// Small jitter centered around 0
fn jitter(seed: f64, amplitude: f64) -> f64 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

fn pose_value(pose: [f64; 3]) -> TelemetryValue {
    TelemetryValue::from(pose.to_vec())
}

fn strings(items: &[&str]) -> TelemetryValue {
    TelemetryValue::Array(items.iter().map(|s| TelemetryValue::from(*s)).collect())
}

// =============================================================================
// DemoSource
// =============================================================================

struct DemoState {
    start_time: Instant,
    sample_count: u64,
    topics: TopicTree,
}

pub struct DemoSource {
    lap: Lap,
    state: Mutex<DemoState>,
}

impl DemoSource {
    pub fn new() -> Self {
        Self::with_field(FieldDimensions::default())
    }

    pub fn with_field(field: FieldDimensions) -> Self {
        Self {
            lap: Lap::for_field(field),
            state: Mutex::new(DemoState {
                start_time: Instant::now(),
                sample_count: 0,
                topics: TopicTree::new(DEMO_PREFIX),
            }),
        }
    }

    /// Publish one sample at `elapsed` seconds and return the flattened tree
    pub fn sample_at(&self, elapsed: f64) -> TelemetryTree {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.sample_count += 1;
        let n = state.sample_count as f64;
        let publish = |topics: &mut TopicTree, name: &str, value: TelemetryValue| {
            topics.apply(&format!("{}{}", DEMO_PREFIX, name), value);
        };
        let topics = &mut state.topics;

        let theta = (elapsed / LAP_DURATION * TAU) % TAU;
        let robot = self.lap.pose(theta);
        let speed = self.lap.speed(theta) + jitter(n, 0.05);
        let lap_progress = theta / TAU;

        // --- Field ---
        publish(topics, "Field/.type", "Field2d".into());
        publish(topics, "Field/Robot", pose_value(robot));
        let planned: Vec<TelemetryValue> = (0..PATH_POINTS)
            .map(|i| pose_value(self.lap.pose(TAU * i as f64 / (PATH_POINTS - 1) as f64)))
            .collect();
        publish(topics, "Field/trajectory", TelemetryValue::Array(planned));
        publish(topics, "Field/Note1", pose_value([self.lap.center_x, self.lap.center_y, 0.0]));
        publish(
            topics,
            "Field/Note2",
            pose_value([self.lap.center_x, self.lap.center_y + 1.45, 0.0]),
        );
        publish(
            topics,
            "Field/Target",
            pose_value([0.4, self.lap.center_y + 1.5, 0.0]),
        );

        // --- Drivetrain ---
        publish(topics, "Drivetrain/speed", speed.into());
        publish(topics, "Drivetrain/heading", robot[2].to_degrees().into());
        publish(topics, "Drivetrain/enabled", true.into());
        publish(topics, "Drivetrain/leftCurrent", (18.0 + speed * 6.0 + jitter(n * 1.1, 1.5)).into());
        publish(topics, "Drivetrain/rightCurrent", (18.0 + speed * 6.0 + jitter(n * 1.2, 1.5)).into());
        for (i, corner) in ["FL", "FR", "BL", "BR"].iter().enumerate() {
            publish(
                topics,
                &format!("Drivetrain/{}Module/angle", corner),
                (robot[2] + jitter(n + i as f64, 0.02)).into(),
            );
        }

        // --- Power ---
        let battery_percent = (1.0 - elapsed / 600.0).clamp(0.0, 1.0);
        publish(topics, "Power/voltage", (12.6 - speed * 0.12 + jitter(n * 2.0, 0.05)).into());
        publish(topics, "Power/batteryPercent", battery_percent.into());
        publish(topics, "Power/brownout", false.into());

        // --- Pneumatics ---
        let pressure = 60.0 + 50.0 * (0.5 + 0.5 * (elapsed * 0.2).sin());
        publish(topics, "Pneumatics/pressure", pressure.into());
        publish(topics, "Pneumatics/compressorRunning", (pressure < 90.0).into());

        // --- Arm ---
        let arm_angle = 45.0 + 40.0 * (elapsed * 0.5).sin();
        publish(topics, "Arm/angle", arm_angle.into());
        publish(topics, "Arm/atSetpoint", ((arm_angle - 45.0).abs() < 5.0).into());
        publish(topics, "Arm/Motor/temperature", (35.0 + elapsed * 0.01).min(70.0).into());
        publish(topics, "Arm/Motor/current", (5.0 + jitter(n * 3.0, 1.0)).into());

        // --- Auto chooser ---
        publish(topics, "Auto Mode/.type", "String Chooser".into());
        publish(topics, "Auto Mode/options", strings(&["Do Nothing", "Two Note", "Four Note"]));
        publish(topics, "Auto Mode/default", "Do Nothing".into());
        publish(topics, "Auto Mode/active", "Four Note".into());

        // --- PathPlanner bookkeeping ---
        publish(topics, "PathPlanner/activePath", "Lap".into());
        publish(topics, "PathPlanner/progress", lap_progress.into());

        // --- Match ---
        publish(topics, "matchTime", (150.0 - elapsed % 150.0).floor().into());
        publish(topics, "mode", "Teleop".into());

        topics.snapshot()
    }

    fn elapsed(&self) -> f64 {
        match self.state.lock() {
            Ok(state) => state.start_time.elapsed().as_secs_f64(),
            Err(poisoned) => poisoned.into_inner().start_time.elapsed().as_secs_f64(),
        }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for DemoSource {
    fn name(&self) -> &str {
        "Demo"
    }

    async fn fetch_tree(&self) -> Result<Option<TelemetryTree>> {
        let elapsed = self.elapsed();
        Ok(Some(self.sample_at(elapsed)))
    }

    async fn status(&self) -> Result<bool> {
        Ok(true)
    }
}
