//! Onboard view of the rover: camera plus six velocity-controlled wheels.

use rover_bridge::{Frame, WheelCommand};
use std::time::Duration;

/// Which side of the chassis a wheel is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelSide {
    Left,
    Right,
}

/// Six-wheel rocker-bogie layout (Sojourner naming)
pub const SOJOURNER_WHEELS: [(&str, WheelSide); 6] = [
    ("FrontLeftWheel", WheelSide::Left),
    ("MiddleLeftWheel", WheelSide::Left),
    ("BackLeftWheel", WheelSide::Left),
    ("FrontRightWheel", WheelSide::Right),
    ("MiddleRightWheel", WheelSide::Right),
    ("BackRightWheel", WheelSide::Right),
];

/// One velocity-controlled wheel motor
#[derive(Debug, Clone, PartialEq)]
pub struct WheelMotor {
    name: &'static str,
    side: WheelSide,
    max_velocity: f32,
    velocity: f32,
}

impl WheelMotor {
    pub fn new(name: &'static str, side: WheelSide, max_velocity: f32) -> Self {
        Self {
            name,
            side,
            max_velocity: max_velocity.abs(),
            velocity: 0.0,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn side(&self) -> WheelSide {
        self.side
    }

    #[inline]
    pub fn max_velocity(&self) -> f32 {
        self.max_velocity
    }

    /// Current angular velocity (rad/s)
    #[inline]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Set angular velocity. The motor never exceeds its rated maximum.
    pub fn set_velocity(&mut self, velocity: f32) {
        self.velocity = velocity.clamp(-self.max_velocity, self.max_velocity);
    }
}

/// Build the six Sojourner wheel motors with a shared max velocity
pub fn sojourner_motors(max_velocity: f32) -> Vec<WheelMotor> {
    SOJOURNER_WHEELS
        .iter()
        .map(|&(name, side)| WheelMotor::new(name, side, max_velocity))
        .collect()
}

/// What an onboard controller can see and drive
pub trait RoverPlatform {
    /// Latest camera image, or `None` when the rover has no camera
    fn camera_frame(&mut self) -> Option<Frame>;

    fn motors(&self) -> &[WheelMotor];

    fn motors_mut(&mut self) -> &mut [WheelMotor];

    /// Control period
    fn time_step(&self) -> Duration;
}

/// Drive every wheel of each side, clamping to `headroom * max_velocity`
/// per motor. Returns the velocities actually applied to the first motor
/// of each side.
pub fn drive_wheels(
    motors: &mut [WheelMotor],
    command: WheelCommand,
    headroom: f32,
) -> WheelCommand {
    let mut applied = WheelCommand::STOP;
    let (mut seen_left, mut seen_right) = (false, false);

    for motor in motors.iter_mut() {
        let limit = headroom * motor.max_velocity();
        let target = match motor.side() {
            WheelSide::Left => command.left,
            WheelSide::Right => command.right,
        };
        motor.set_velocity(target.clamp(-limit, limit));

        match motor.side() {
            WheelSide::Left if !seen_left => {
                applied.left = motor.velocity();
                seen_left = true;
            }
            WheelSide::Right if !seen_right => {
                applied.right = motor.velocity();
                seen_right = true;
            }
            _ => {}
        }
    }
    applied
}

/// Mean angular velocity per side (left, right)
pub fn side_velocities(motors: &[WheelMotor]) -> (f32, f32) {
    let mean = |side: WheelSide| {
        let (sum, n) = motors
            .iter()
            .filter(|m| m.side() == side)
            .fold((0.0f32, 0usize), |(s, n), m| (s + m.velocity(), n + 1));
        if n == 0 { 0.0 } else { sum / n as f32 }
    };
    (mean(WheelSide::Left), mean(WheelSide::Right))
}
