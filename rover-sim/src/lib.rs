//! Rover Sim - stand-in simulator for the rover bridge
//!
//! A kinematic six-wheel rover in a seeded rock field, rendered by a
//! ray-cast camera. The simulator either serves bridge clients (teleop,
//! HUD, training environment) or drives itself with the onboard reflex
//! hazard controller.
//!
//! - [`mock::MockRover`]: simulated rover, implements
//!   [`rover_bridge::BridgeBackend`] and [`platform::RoverPlatform`]
//! - [`reflex::ReflexController`]: hazard-mask rule-table avoider
//! - [`simulation::Simulation`]: fixed-period tick loop

pub mod config;
pub mod error;
pub mod mock;
pub mod platform;
pub mod reflex;
pub mod simulation;

// Re-export commonly used types
pub use config::{ControlMode, SimConfig};
pub use error::{Result, SimError};
pub use mock::MockRover;
pub use platform::{RoverPlatform, WheelMotor, WheelSide};
pub use reflex::{Maneuver, ReflexController, ReflexParams, TickReport};
pub use simulation::Simulation;
