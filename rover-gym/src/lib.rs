//! Rover Gym - training environment and operator clients
//!
//! Wraps a bridge connection to the simulator in a reset/step interface
//! with a shaped reward:
//!
//! ```no_run
//! use rover_gym::{Action, EnvConfig, RoverEnv};
//!
//! let config = EnvConfig::from_env()?;
//! let mut env = RoverEnv::new(&config)?;
//! let _first = env.reset()?;
//! let step = env.step(&Action::Discrete(2))?;
//! println!("reward {:.3}, center risk {:.2}", step.reward, step.info.risk.center);
//! # Ok::<(), rover_gym::EnvError>(())
//! ```
//!
//! The binaries in `src/bin` are thin clients over the same bridge:
//! `rover-teleop` (keyboard driving), `rover-hud` (risk readout) and
//! `rover-rollout` (random-policy episodes).

pub mod action;
pub mod config;
pub mod env;
pub mod episode;
pub mod error;
pub mod reward;
pub mod teleop;

// Re-export commonly used types
pub use action::{Action, ActionMode, ActionSpace, DISCRETE_ACTIONS, ObservationSpace};
pub use config::EnvConfig;
pub use env::{Connector, RoverEnv, Step, StepInfo, TcpConnector};
pub use episode::{EpisodeState, TerminationPolicy};
pub use error::{EnvError, Result};
pub use reward::RewardWeights;
pub use teleop::{Drive, KeyAction};
