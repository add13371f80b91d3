//! Simulator configuration
//!
//! Loaded from a TOML file. Every field has a default, so an empty file
//! yields a runnable bridge-mode simulator.
//!
//! ```text
//! SimConfig
//! ├── NetworkConfig       # bind_address
//! ├── SimulationConfig    # mode, tick_ms, speed_factor, seed
//! │   └── ScatterConfig   # rock field
//! ├── RobotConfig         # chassis, motors, start pose, collisions
//! ├── CameraConfig        # resolution, fov, range
//! ├── ReflexConfig        # rule-table params + hazard mask
//! └── LoggingConfig
//! ```
//!
//! Example (`rover-sim.toml`):
//!
//! ```toml
//! [network]
//! bind_address = "127.0.0.1:5555"
//!
//! [simulation]
//! mode = "reflex"
//! seed = 42
//!
//! [simulation.scatter]
//! rock_count = 60
//!
//! [reflex]
//! forward_speed = 0.5
//!
//! [reflex.hazard]
//! min_area = 200
//! ```

use crate::error::{Result, SimError};
use crate::reflex::ReflexParams;
use rover_bridge::BGR_CHANNELS;
use rover_bridge::protocol::MAX_FRAME_BYTES;
use rover_perception::HazardMaskConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Top-level simulator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub reflex: ReflexConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============================================================================
// Network
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// TCP bind address for bridge clients
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:5555".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// Who drives the wheels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// Bridge clients send SET_V
    #[default]
    Bridge,
    /// Onboard reflex controller; bridge SET_V is ignored
    Reflex,
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::Bridge => write!(f, "bridge"),
            ControlMode::Reflex => write!(f, "reflex"),
        }
    }
}

impl FromStr for ControlMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bridge" => Ok(ControlMode::Bridge),
            "reflex" => Ok(ControlMode::Reflex),
            other => Err(SimError::Config(format!(
                "unknown control mode '{}' (expected bridge or reflex)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub mode: ControlMode,

    /// Control period in simulated milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Simulated time per wall-clock time (2.0 = twice real time)
    #[serde(default = "default_speed_factor")]
    pub speed_factor: f32,

    /// Rock scatter seed (0 = random each run)
    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub scatter: ScatterConfig,
}

fn default_tick_ms() -> u64 {
    64
}
fn default_speed_factor() -> f32 {
    1.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mode: ControlMode::default(),
            tick_ms: default_tick_ms(),
            speed_factor: default_speed_factor(),
            seed: 0,
            scatter: ScatterConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Simulated time advanced per tick
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Random rock field parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterConfig {
    #[serde(default = "default_rock_count")]
    pub rock_count: usize,

    /// Side of the square arena centered on the origin (meters)
    #[serde(default = "default_area")]
    pub area: f32,

    /// Rock-free radius around the origin (meters)
    #[serde(default = "default_safe_radius")]
    pub safe_radius: f32,

    #[serde(default = "default_min_scale")]
    pub min_scale: f32,

    #[serde(default = "default_max_scale")]
    pub max_scale: f32,

    /// Rock radius at scale 1.0 (meters)
    #[serde(default = "default_base_radius")]
    pub base_radius: f32,
}

fn default_rock_count() -> usize {
    40
}
fn default_area() -> f32 {
    16.0
}
fn default_safe_radius() -> f32 {
    2.0
}
fn default_min_scale() -> f32 {
    0.4
}
fn default_max_scale() -> f32 {
    1.2
}
fn default_base_radius() -> f32 {
    0.3
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            rock_count: default_rock_count(),
            area: default_area(),
            safe_radius: default_safe_radius(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            base_radius: default_base_radius(),
        }
    }
}

// ============================================================================
// Robot
// ============================================================================

/// Chassis and drive parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Wheel radius (meters)
    #[serde(default = "default_wheel_radius")]
    pub wheel_radius: f32,

    /// Distance between left and right wheel rows (meters)
    #[serde(default = "default_track_width")]
    pub track_width: f32,

    /// Collision radius of the chassis (meters)
    #[serde(default = "default_body_radius")]
    pub body_radius: f32,

    /// Rated wheel motor speed (rad/s)
    #[serde(default = "default_motor_max_velocity")]
    pub motor_max_velocity: f32,

    /// "stop", "slide" or "passthrough"
    #[serde(default = "default_collision_mode")]
    pub collision_mode: String,

    #[serde(default = "default_slide_friction")]
    pub slide_friction: f32,

    #[serde(default)]
    pub start_x: f32,
    #[serde(default)]
    pub start_y: f32,
    #[serde(default)]
    pub start_theta: f32,
}

fn default_wheel_radius() -> f32 {
    0.13
}
fn default_track_width() -> f32 {
    0.5
}
fn default_body_radius() -> f32 {
    0.35
}
fn default_motor_max_velocity() -> f32 {
    6.0
}
fn default_collision_mode() -> String {
    "stop".to_string()
}
fn default_slide_friction() -> f32 {
    0.5
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            wheel_radius: default_wheel_radius(),
            track_width: default_track_width(),
            body_radius: default_body_radius(),
            motor_max_velocity: default_motor_max_velocity(),
            collision_mode: default_collision_mode(),
            slide_friction: default_slide_friction(),
            start_x: 0.0,
            start_y: 0.0,
            start_theta: 0.0,
        }
    }
}

// ============================================================================
// Camera
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Rover without a camera runs the reflex controller open-loop
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Horizontal field of view (degrees)
    #[serde(default = "default_fov")]
    pub fov: f32,

    /// Rocks farther than this are not drawn (meters)
    #[serde(default = "default_range")]
    pub range: f32,

    /// Lens height above ground (meters)
    #[serde(default = "default_mount_height")]
    pub mount_height: f32,
}

fn default_true() -> bool {
    true
}
fn default_width() -> u32 {
    160
}
fn default_height() -> u32 {
    120
}
fn default_fov() -> f32 {
    60.0
}
fn default_range() -> f32 {
    8.0
}
fn default_mount_height() -> f32 {
    0.3
}

impl CameraConfig {
    /// Size of one rendered BGR frame, saturating at `u64::MAX`
    pub fn frame_bytes(&self) -> u64 {
        u64::from(self.width)
            .saturating_mul(u64::from(self.height))
            .saturating_mul(u64::from(BGR_CHANNELS))
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: default_width(),
            height: default_height(),
            fov: default_fov(),
            range: default_range(),
            mount_height: default_mount_height(),
        }
    }
}

// ============================================================================
// Reflex + logging
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflexConfig {
    #[serde(flatten)]
    pub params: ReflexParams,

    #[serde(default)]
    pub hazard: HazardMaskConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl SimConfig {
    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SimError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| SimError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the simulator cannot run with
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if sim.tick_ms == 0 {
            return Err(invalid("simulation.tick_ms must be > 0"));
        }
        if !(sim.speed_factor > 0.0) {
            return Err(invalid("simulation.speed_factor must be > 0"));
        }

        let scatter = &sim.scatter;
        if !(scatter.area > 0.0) || scatter.safe_radius < 0.0 {
            return Err(invalid("scatter area must be > 0 and safe_radius >= 0"));
        }
        // Otherwise rejection sampling never finds a spot
        if scatter.rock_count > 0 && scatter.safe_radius >= scatter.area / 2.0 {
            return Err(invalid(format!(
                "scatter safe_radius ({:.1}m) must be smaller than half the area ({:.1}m)",
                scatter.safe_radius,
                scatter.area / 2.0
            )));
        }
        if !(scatter.min_scale > 0.0) || scatter.min_scale > scatter.max_scale {
            return Err(invalid("scatter requires 0 < min_scale <= max_scale"));
        }
        if !(scatter.base_radius > 0.0) {
            return Err(invalid("scatter.base_radius must be > 0"));
        }

        let robot = &self.robot;
        if !(robot.wheel_radius > 0.0) || !(robot.track_width > 0.0) {
            return Err(invalid("robot wheel_radius and track_width must be > 0"));
        }
        if !(robot.body_radius > 0.0) || !(robot.motor_max_velocity > 0.0) {
            return Err(invalid("robot body_radius and motor_max_velocity must be > 0"));
        }
        if !matches!(
            robot.collision_mode.as_str(),
            "stop" | "slide" | "passthrough"
        ) {
            return Err(invalid(format!(
                "unknown robot.collision_mode '{}'",
                robot.collision_mode
            )));
        }

        let cam = &self.camera;
        if cam.width < 3 || cam.height == 0 {
            return Err(invalid("camera must be at least 3 pixels wide and 1 high"));
        }
        if cam.frame_bytes() > MAX_FRAME_BYTES as u64 {
            return Err(invalid(format!(
                "camera {}x{} exceeds the {} byte frame limit",
                cam.width, cam.height, MAX_FRAME_BYTES
            )));
        }
        if !(cam.fov > 0.0 && cam.fov < 180.0) {
            return Err(invalid("camera.fov must be in (0, 180) degrees"));
        }
        if !(cam.range > 0.0) || cam.mount_height < 0.0 {
            return Err(invalid("camera range must be > 0 and mount_height >= 0"));
        }

        self.reflex.params.validate()
    }
}

fn invalid(msg: impl Into<String>) -> SimError {
    SimError::Config(msg.into())
}
