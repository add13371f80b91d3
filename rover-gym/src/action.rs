//! Action and observation spaces
//!
//! Two action encodings, fixed when the environment is built:
//!
//! | Index | Name | Left | Right |
//! |-------|------|------|-------|
//! | 0 | hard-left | -3.0 | 3.0 |
//! | 1 | left | 0.5 | 2.0 |
//! | 2 | forward | 2.5 | 2.5 |
//! | 3 | right | 2.0 | 0.5 |
//! | 4 | hard-right | 3.0 | -3.0 |
//!
//! or a continuous `[left, right]` pair, each in `[-4, 4]` rad/s.

use crate::error::{EnvError, Result};
use rand::Rng;
use rover_bridge::{BGR_CHANNELS, Frame, WheelCommand};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete action table: (name, wheel velocities)
pub const DISCRETE_ACTIONS: [(&str, WheelCommand); 5] = [
    ("hard-left", WheelCommand::new(-3.0, 3.0)),
    ("left", WheelCommand::new(0.5, 2.0)),
    ("forward", WheelCommand::new(2.5, 2.5)),
    ("right", WheelCommand::new(2.0, 0.5)),
    ("hard-right", WheelCommand::new(3.0, -3.0)),
];

/// Per-wheel bound of the continuous action space (rad/s)
pub const CONTINUOUS_LIMIT: f32 = 4.0;

/// Which encoding the environment accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionMode {
    #[default]
    Discrete,
    Continuous,
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionMode::Discrete => write!(f, "discrete"),
            ActionMode::Continuous => write!(f, "continuous"),
        }
    }
}

impl FromStr for ActionMode {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discrete" => Ok(ActionMode::Discrete),
            "continuous" => Ok(ActionMode::Continuous),
            other => Err(EnvError::Configuration(format!(
                "unknown action mode '{}' (expected discrete or continuous)",
                other
            ))),
        }
    }
}

/// One action from the trainer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Index into [`DISCRETE_ACTIONS`]
    Discrete(usize),
    /// `[left, right]` wheel velocities
    Continuous([f32; 2]),
}

/// Action space descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpace {
    mode: ActionMode,
}

impl ActionSpace {
    pub fn new(mode: ActionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ActionMode {
        self.mode
    }

    /// Number of choices in discrete mode
    pub fn n(&self) -> Option<usize> {
        match self.mode {
            ActionMode::Discrete => Some(DISCRETE_ACTIONS.len()),
            ActionMode::Continuous => None,
        }
    }

    /// `(low, high)` per wheel in continuous mode
    pub fn bounds(&self) -> Option<([f32; 2], [f32; 2])> {
        match self.mode {
            ActionMode::Discrete => None,
            ActionMode::Continuous => Some((
                [-CONTINUOUS_LIMIT, -CONTINUOUS_LIMIT],
                [CONTINUOUS_LIMIT, CONTINUOUS_LIMIT],
            )),
        }
    }

    /// Wheel velocities for an action, or a configuration error if the
    /// action is of the wrong kind or out of range
    pub fn to_command(&self, action: &Action) -> Result<WheelCommand> {
        match (self.mode, *action) {
            (ActionMode::Discrete, Action::Discrete(index)) => DISCRETE_ACTIONS
                .get(index)
                .map(|&(_, command)| command)
                .ok_or_else(|| {
                    EnvError::Configuration(format!(
                        "discrete action {} out of range 0..{}",
                        index,
                        DISCRETE_ACTIONS.len()
                    ))
                }),
            (ActionMode::Continuous, Action::Continuous([left, right])) => {
                for v in [left, right] {
                    if !v.is_finite() || v.abs() > CONTINUOUS_LIMIT {
                        return Err(EnvError::Configuration(format!(
                            "continuous action [{}, {}] outside [-{}, {}]",
                            left, right, CONTINUOUS_LIMIT, CONTINUOUS_LIMIT
                        )));
                    }
                }
                Ok(WheelCommand::new(left, right))
            }
            (mode, action) => Err(EnvError::Configuration(format!(
                "{:?} given to a {} action space",
                action, mode
            ))),
        }
    }

    pub fn contains(&self, action: &Action) -> bool {
        self.to_command(action).is_ok()
    }

    /// Uniformly random action
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Action {
        match self.mode {
            ActionMode::Discrete => Action::Discrete(rng.random_range(0..DISCRETE_ACTIONS.len())),
            ActionMode::Continuous => Action::Continuous([
                rng.random_range(-CONTINUOUS_LIMIT..=CONTINUOUS_LIMIT),
                rng.random_range(-CONTINUOUS_LIMIT..=CONTINUOUS_LIMIT),
            ]),
        }
    }
}

/// Observation space: `height x width x 3` BGR bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationSpace {
    pub height: u32,
    pub width: u32,
}

impl ObservationSpace {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// `(H, W, C)`
    pub fn shape(&self) -> (u32, u32, u32) {
        (self.height, self.width, BGR_CHANNELS)
    }

    pub fn contains(&self, frame: &Frame) -> bool {
        (frame.height(), frame.width(), frame.channels()) == self.shape()
    }

    /// Error unless the frame matches the declared shape
    pub fn check(&self, frame: &Frame) -> Result<()> {
        if self.contains(frame) {
            Ok(())
        } else {
            Err(EnvError::ObservationShape {
                expected: self.shape(),
                got: (frame.height(), frame.width(), frame.channels()),
            })
        }
    }
}
