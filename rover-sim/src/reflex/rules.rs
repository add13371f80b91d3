//! Reflex rule table.
//!
//! Rules are evaluated top to bottom; the first guard that holds picks the
//! maneuver. The last rule always matches.
//!
//! | # | Guard | Maneuver |
//! |---|-------|----------|
//! | 1 | `C > threshold * center_bias` | pivot away from the denser side |
//! | 2 | `L > threshold && L > R` | drift away from the left |
//! | 3 | `R > threshold && R > L` | drift away from the right |
//! | 4 | always | cruise |

use crate::error::{Result, SimError};
use rover_bridge::WheelCommand;
use rover_perception::RiskTriple;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speeds and thresholds of the reflex controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflexParams {
    /// Cruise wheel velocity (rad/s)
    #[serde(default = "default_forward_speed")]
    pub forward_speed: f32,

    /// Pivot wheel velocity (rad/s)
    #[serde(default = "default_turn_speed")]
    pub turn_speed: f32,

    /// Hazard fraction of a side band that triggers a drift
    #[serde(default = "default_risk_turn_threshold")]
    pub risk_turn_threshold: f32,

    /// Center triggers a pivot at `risk_turn_threshold * center_bias`
    #[serde(default = "default_center_bias")]
    pub center_bias: f32,

    /// Hazardous-side wheel speed during a drift, as a fraction of forward
    #[serde(default = "default_drift_factor")]
    pub drift_factor: f32,

    /// Fraction of each motor's max velocity the controller may use
    #[serde(default = "default_headroom")]
    pub headroom: f32,
}

fn default_forward_speed() -> f32 {
    0.42
}
fn default_turn_speed() -> f32 {
    0.32
}
fn default_risk_turn_threshold() -> f32 {
    0.08
}
fn default_center_bias() -> f32 {
    0.6
}
fn default_drift_factor() -> f32 {
    0.6
}
fn default_headroom() -> f32 {
    0.8
}

impl Default for ReflexParams {
    fn default() -> Self {
        Self {
            forward_speed: default_forward_speed(),
            turn_speed: default_turn_speed(),
            risk_turn_threshold: default_risk_turn_threshold(),
            center_bias: default_center_bias(),
            drift_factor: default_drift_factor(),
            headroom: default_headroom(),
        }
    }
}

impl ReflexParams {
    /// Reject parameters the controller cannot drive with
    pub fn validate(&self) -> Result<()> {
        let speeds = [
            self.forward_speed,
            self.turn_speed,
            self.risk_turn_threshold,
            self.center_bias,
            self.drift_factor,
        ];
        if speeds.iter().any(|v| !v.is_finite()) {
            return Err(SimError::Config(
                "reflex speeds and thresholds must be finite".to_string(),
            ));
        }
        if !(self.headroom > 0.0 && self.headroom <= 1.0) {
            return Err(SimError::Config(format!(
                "reflex.headroom must be in (0, 1], got {}",
                self.headroom
            )));
        }
        Ok(())
    }
}

/// What the controller decided to do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maneuver {
    /// Center blocked, left denser: spin clockwise
    PivotAwayFromLeft,
    /// Center blocked, right at least as dense: spin counter-clockwise
    PivotAwayFromRight,
    /// Left hazardous: slow the left wheels
    DriftAwayFromLeft,
    /// Right hazardous: slow the right wheels
    DriftAwayFromRight,
    /// Nothing in the way
    Cruise,
}

impl Maneuver {
    /// Wheel velocities for this maneuver (before motor clamping)
    pub fn command(&self, params: &ReflexParams) -> WheelCommand {
        let fwd = params.forward_speed;
        let turn = params.turn_speed;
        let slow = fwd * params.drift_factor;
        match self {
            Maneuver::PivotAwayFromLeft => WheelCommand::new(turn, -turn),
            Maneuver::PivotAwayFromRight => WheelCommand::new(-turn, turn),
            Maneuver::DriftAwayFromLeft => WheelCommand::new(slow, fwd),
            Maneuver::DriftAwayFromRight => WheelCommand::new(fwd, slow),
            Maneuver::Cruise => WheelCommand::new(fwd, fwd),
        }
    }
}

impl fmt::Display for Maneuver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Maneuver::PivotAwayFromLeft => "pivot-right",
            Maneuver::PivotAwayFromRight => "pivot-left",
            Maneuver::DriftAwayFromLeft => "drift-from-left",
            Maneuver::DriftAwayFromRight => "drift-from-right",
            Maneuver::Cruise => "cruise",
        };
        f.write_str(name)
    }
}

/// One row of the decision list
pub struct Rule {
    pub name: &'static str,
    pub guard: fn(&RiskTriple, &ReflexParams) -> bool,
    pub action: fn(&RiskTriple) -> Maneuver,
}

/// Prioritized decision list
pub const RULES: [Rule; 4] = [
    Rule {
        name: "center-blocked",
        guard: center_blocked,
        action: pivot_away,
    },
    Rule {
        name: "left-hazard",
        guard: left_hazard,
        action: |_| Maneuver::DriftAwayFromLeft,
    },
    Rule {
        name: "right-hazard",
        guard: right_hazard,
        action: |_| Maneuver::DriftAwayFromRight,
    },
    Rule {
        name: "clear",
        guard: |_, _| true,
        action: |_| Maneuver::Cruise,
    },
];

fn center_blocked(risk: &RiskTriple, params: &ReflexParams) -> bool {
    risk.center > params.risk_turn_threshold * params.center_bias
}

fn left_hazard(risk: &RiskTriple, params: &ReflexParams) -> bool {
    risk.left > params.risk_turn_threshold && risk.left > risk.right
}

fn right_hazard(risk: &RiskTriple, params: &ReflexParams) -> bool {
    risk.right > params.risk_turn_threshold && risk.right > risk.left
}

fn pivot_away(risk: &RiskTriple) -> Maneuver {
    if risk.left > risk.right {
        Maneuver::PivotAwayFromLeft
    } else {
        Maneuver::PivotAwayFromRight
    }
}

/// First matching rule's maneuver
pub fn decide(risk: &RiskTriple, params: &ReflexParams) -> Maneuver {
    RULES
        .iter()
        .find(|rule| (rule.guard)(risk, params))
        .map(|rule| (rule.action)(risk))
        .unwrap_or(Maneuver::Cruise)
}
