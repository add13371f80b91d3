//! Stand-in rover simulator
//!
//! A kinematic six-wheel rover driving through a field of cylindrical rocks,
//! seen through a ray-cast forward camera. It plays two roles:
//!
//! | Role | Trait | Used by |
//! |------|-------|---------|
//! | Onboard view | [`RoverPlatform`] | reflex controller (same process) |
//! | Bridge endpoint | [`BridgeBackend`] | `BridgeServer` (remote clients) |
//!
//! # Simulation Step
//!
//! ```text
//! Every tick:
//! 1. (reflex mode) controller reads camera, sets wheel motors
//! 2. Mean left/right wheel velocity -> skid-steer kinematics
//! 3. Collision check against rocks (stop / slide / passthrough)
//! ```
//!
//! In reflex mode bridge `SET_V` commands are ignored so only one strategy
//! drives the motors. `RESET` restores the start pose and stops the wheels;
//! the rock field is kept.
//!
//! # Module Structure
//!
//! - [`scene`]: rock field and ray casting
//! - [`physics`]: kinematics and collision handling
//! - [`camera`]: per-column ray-cast renderer

pub mod camera;
pub mod physics;
pub mod scene;

use crate::config::{ControlMode, SimConfig};
use crate::error::Result;
use crate::platform::{RoverPlatform, WheelMotor, WheelSide, side_velocities, sojourner_motors};

use camera::CameraSimulator;
use physics::PhysicsState;
use scene::Scene;

use rover_bridge::{BridgeBackend, Frame, WheelCommand};
use std::time::Duration;

/// Pose in the world frame: x, y (meters), heading (radians)
pub type Pose = (f32, f32, f32);

/// Simulated rover and its world
pub struct MockRover {
    physics: PhysicsState,
    scene: Scene,
    camera: Option<CameraSimulator>,
    motors: Vec<WheelMotor>,
    start: Pose,
    tick: Duration,
    /// Whether bridge SET_V reaches the motors
    bridge_actuation: bool,
    ignored_commands: u64,
    sim_time: Duration,
    in_contact: bool,
    collisions: u64,
}

impl MockRover {
    /// Build the rover and scatter a rock field from the config seed
    pub fn new(config: &SimConfig) -> Result<Self> {
        let scene = Scene::scatter(&config.simulation.scatter, config.simulation.seed);
        Self::with_scene(config, scene)
    }

    /// Build the rover in a given scene
    pub fn with_scene(config: &SimConfig, scene: Scene) -> Result<Self> {
        config.validate()?;

        let robot = &config.robot;
        let camera = config
            .camera
            .enabled
            .then(|| CameraSimulator::new(&config.camera));
        if camera.is_none() {
            log::warn!("Camera disabled: frame requests will fail");
        }

        Ok(Self {
            physics: PhysicsState::new(robot),
            scene,
            camera,
            motors: sojourner_motors(robot.motor_max_velocity),
            start: (robot.start_x, robot.start_y, robot.start_theta),
            tick: config.simulation.tick(),
            bridge_actuation: config.simulation.mode == ControlMode::Bridge,
            ignored_commands: 0,
            sim_time: Duration::ZERO,
            in_contact: false,
            collisions: 0,
        })
    }

    pub fn pose(&self) -> Pose {
        (self.physics.x(), self.physics.y(), self.physics.theta())
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Simulated time since start (not reset by RESET)
    pub fn sim_time(&self) -> Duration {
        self.sim_time
    }

    /// Number of times the chassis ran into a rock
    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    /// Whether the chassis is currently pressed against a rock
    pub fn in_contact(&self) -> bool {
        self.in_contact
    }

    pub fn bridge_actuation(&self) -> bool {
        self.bridge_actuation
    }

    /// Allow or ignore SET_V from bridge clients
    pub fn set_bridge_actuation(&mut self, enabled: bool) {
        self.bridge_actuation = enabled;
    }

    /// Advance physics by `dt` using the current motor velocities.
    ///
    /// Returns true if the chassis is blocked by a rock after the step.
    pub fn advance(&mut self, dt: Duration) -> bool {
        let (left, right) = side_velocities(&self.motors);
        let collided = self
            .physics
            .update(dt.as_secs_f32(), left, right, &self.scene);
        self.sim_time += dt;

        if collided && !self.in_contact {
            self.collisions += 1;
            log::info!(
                "Collision at ({:.2}, {:.2}) heading {:.0}°",
                self.physics.x(),
                self.physics.y(),
                self.physics.theta().to_degrees()
            );
        }
        self.in_contact = collided;
        collided
    }

    /// Render the current camera view
    pub fn render(&self) -> rover_bridge::Result<Frame> {
        let camera = self
            .camera
            .as_ref()
            .ok_or_else(|| rover_bridge::Error::Backend("rover has no camera".to_string()))?;
        let (x, y, theta) = self.pose();
        camera.render(&self.scene, x, y, theta)
    }

    fn stop_motors(&mut self) {
        for motor in &mut self.motors {
            motor.set_velocity(0.0);
        }
    }
}

impl RoverPlatform for MockRover {
    fn camera_frame(&mut self) -> Option<Frame> {
        self.camera.as_ref()?;
        match self.render() {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::warn!("Camera render failed: {}", e);
                None
            }
        }
    }

    fn motors(&self) -> &[WheelMotor] {
        &self.motors
    }

    fn motors_mut(&mut self) -> &mut [WheelMotor] {
        &mut self.motors
    }

    fn time_step(&self) -> Duration {
        self.tick
    }
}

impl BridgeBackend for MockRover {
    fn capture(&mut self) -> rover_bridge::Result<Frame> {
        self.render()
    }

    fn reset(&mut self) -> rover_bridge::Result<Frame> {
        let (x, y, theta) = self.start;
        self.physics.teleport(x, y, theta);
        self.stop_motors();
        self.in_contact = false;
        log::info!("Reset to ({:.2}, {:.2}, {:.2})", x, y, theta);
        self.render()
    }

    fn set_wheel_velocity(&mut self, command: WheelCommand) -> rover_bridge::Result<()> {
        if !self.bridge_actuation {
            if self.ignored_commands == 0 {
                log::warn!("Ignoring SET_V from bridge: reflex controller owns the motors");
            }
            self.ignored_commands += 1;
            return Ok(());
        }

        for motor in &mut self.motors {
            let target = match motor.side() {
                WheelSide::Left => command.left,
                WheelSide::Right => command.right,
            };
            motor.set_velocity(target);
        }
        log::debug!("SET_V left={:.2} right={:.2}", command.left, command.right);
        Ok(())
    }
}
