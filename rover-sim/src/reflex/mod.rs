//! Reflex hazard controller
//!
//! Runs inside the simulator, one iteration per control tick:
//!
//! ```text
//! camera frame ─▶ hazard mask ─▶ L/C/R densities ─▶ rule table ─▶ wheels
//! ```
//!
//! The controller keeps no state between ticks apart from elapsed time
//! (used to rate-limit its diagnostic log). Without a camera it drives
//! straight ahead open-loop.

pub mod rules;

pub use rules::{Maneuver, ReflexParams, decide};

use crate::error::Result;
use crate::platform::{RoverPlatform, drive_wheels};
use rover_bridge::WheelCommand;
use rover_perception::{HazardDetector, HazardMaskConfig, RiskTriple};
use std::time::Duration;

/// Interval between diagnostic log lines (simulated time)
const LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of one control tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Hazard densities per third (all zero without a camera)
    pub densities: RiskTriple,
    pub maneuver: Maneuver,
    /// Rule-table output before motor clamping
    pub command: WheelCommand,
    /// Velocities actually applied after clamping
    pub applied: WheelCommand,
    /// False when the tick ran open-loop
    pub camera: bool,
}

/// Deterministic rule-based obstacle avoider
pub struct ReflexController {
    params: ReflexParams,
    detector: HazardDetector,
    elapsed: Duration,
    next_log: Duration,
}

impl ReflexController {
    pub fn new(params: ReflexParams, hazard: HazardMaskConfig) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            detector: HazardDetector::new(hazard)?,
            elapsed: Duration::ZERO,
            next_log: Duration::ZERO,
        })
    }

    pub fn params(&self) -> &ReflexParams {
        &self.params
    }

    /// Simulated time this controller has been running
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Run one control iteration against the platform
    pub fn tick<P: RoverPlatform + ?Sized>(&mut self, platform: &mut P) -> TickReport {
        let frame = platform.camera_frame();
        let camera = frame.is_some();

        let densities = match &frame {
            Some(frame) => self.detector.detect(frame).densities(),
            None => RiskTriple::CLEAR,
        };
        let maneuver = decide(&densities, &self.params);
        let command = maneuver.command(&self.params);
        let applied = drive_wheels(platform.motors_mut(), command, self.params.headroom);

        if camera && self.elapsed >= self.next_log {
            log::info!(
                "[risk] L={:.3} C={:.3} R={:.3} -> {} vl={:.2} vr={:.2}",
                densities.left,
                densities.center,
                densities.right,
                maneuver,
                applied.left,
                applied.right
            );
            self.next_log = self.elapsed + LOG_INTERVAL;
        }
        self.elapsed += platform.time_step();

        TickReport {
            densities,
            maneuver,
            command,
            applied,
            camera,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{WheelMotor, sojourner_motors};
    use approx::assert_relative_eq;
    use rover_bridge::Frame;

    /// Platform with a fixed camera image
    struct StillPlatform {
        frame: Option<Frame>,
        motors: Vec<WheelMotor>,
    }

    impl StillPlatform {
        fn new(frame: Option<Frame>) -> Self {
            Self {
                frame,
                motors: sojourner_motors(0.6),
            }
        }
    }

    impl RoverPlatform for StillPlatform {
        fn camera_frame(&mut self) -> Option<Frame> {
            self.frame.clone()
        }

        fn motors(&self) -> &[WheelMotor] {
            &self.motors
        }

        fn motors_mut(&mut self) -> &mut [WheelMotor] {
            &mut self.motors
        }

        fn time_step(&self) -> Duration {
            Duration::from_millis(64)
        }
    }

    fn controller() -> ReflexController {
        ReflexController::new(ReflexParams::default(), HazardMaskConfig::default()).unwrap()
    }

    /// Black frame with a white block over columns `x0..x1`
    fn block_frame(x0: u32, x1: u32) -> Frame {
        let mut frame = Frame::filled(120, 160, [0, 0, 0]).unwrap();
        for y in 30..90 {
            for x in x0..x1 {
                frame.pixel_mut(x, y).unwrap().copy_from_slice(&[255, 255, 255]);
            }
        }
        frame
    }

    #[test]
    fn test_without_camera_cruises_open_loop() {
        let mut platform = StillPlatform::new(None);
        let mut ctrl = controller();
        let report = ctrl.tick(&mut platform);

        assert!(!report.camera);
        assert_eq!(report.maneuver, Maneuver::Cruise);
        assert_relative_eq!(platform.motors()[0].velocity(), 0.42);
        assert_eq!(ctrl.elapsed(), Duration::from_millis(64));
    }

    #[test]
    fn test_clear_view_cruises() {
        let mut platform = StillPlatform::new(Some(Frame::filled(120, 160, [90, 120, 150]).unwrap()));
        let report = controller().tick(&mut platform);
        assert!(report.camera);
        assert_eq!(report.densities, RiskTriple::CLEAR);
        assert_eq!(report.applied, WheelCommand::new(0.42, 0.42));
    }

    #[test]
    fn test_blocked_center_pivots() {
        let mut platform = StillPlatform::new(Some(block_frame(60, 100)));
        let report = controller().tick(&mut platform);
        assert!(report.densities.center > 0.3);
        assert!(matches!(
            report.maneuver,
            Maneuver::PivotAwayFromLeft | Maneuver::PivotAwayFromRight
        ));
        assert_relative_eq!(report.applied.left.abs(), 0.32);
        assert_relative_eq!(report.applied.right, -report.applied.left);
    }

    #[test]
    fn test_right_hazard_slows_right_wheels() {
        let mut platform = StillPlatform::new(Some(block_frame(120, 150)));
        let report = controller().tick(&mut platform);
        assert_eq!(report.densities.center, 0.0);
        assert_eq!(report.maneuver, Maneuver::DriftAwayFromRight);
        assert_relative_eq!(report.applied.left, 0.42);
        assert_relative_eq!(report.applied.right, 0.42 * 0.6);
    }

    #[test]
    fn test_turn_speed_clamped_by_headroom() {
        let params = ReflexParams {
            forward_speed: 2.0,
            ..Default::default()
        };
        let mut ctrl = ReflexController::new(params, HazardMaskConfig::default()).unwrap();
        let mut platform = StillPlatform::new(None);
        let report = ctrl.tick(&mut platform);
        assert_relative_eq!(report.command.left, 2.0);
        assert_relative_eq!(report.applied.left, 0.48, epsilon = 1e-6);
    }

    #[test]
    fn test_rejects_unusable_headroom() {
        for headroom in [-0.5, 0.0, 1.5, f32::NAN] {
            let params = ReflexParams {
                headroom,
                ..Default::default()
            };
            let result = ReflexController::new(params, HazardMaskConfig::default());
            assert!(
                matches!(result, Err(crate::error::SimError::Config(_))),
                "headroom {}",
                headroom
            );
        }

        let params = ReflexParams {
            turn_speed: f32::INFINITY,
            ..Default::default()
        };
        assert!(ReflexController::new(params, HazardMaskConfig::default()).is_err());

        let params = ReflexParams {
            headroom: 1.0,
            ..Default::default()
        };
        assert!(ReflexController::new(params, HazardMaskConfig::default()).is_ok());
    }
}
