//! Reward shaping
//!
//! ```text
//! progress = max(0, 1 - center_risk)
//! delta    = max(progress - previous_progress, progress_floor)
//! reward   = w_progress * delta
//!          - w_energy * (|vl| + |vr|)
//!          - w_collision * collision
//!          - w_time
//! ```

use serde::{Deserialize, Serialize};

/// Weights of the shaped reward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardWeights {
    #[serde(default = "default_progress")]
    pub progress: f32,

    /// Per unit of wheel effort `|vl| + |vr|`
    #[serde(default = "default_energy")]
    pub energy: f32,

    #[serde(default = "default_collision")]
    pub collision: f32,

    /// Constant per-step cost
    #[serde(default = "default_time")]
    pub time: f32,
}

fn default_progress() -> f32 {
    5.0
}
fn default_energy() -> f32 {
    0.02
}
fn default_collision() -> f32 {
    20.0
}
fn default_time() -> f32 {
    0.01
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            progress: default_progress(),
            energy: default_energy(),
            collision: default_collision(),
            time: default_time(),
        }
    }
}

impl RewardWeights {
    /// Shaped reward for one step
    pub fn reward(&self, progress_delta: f32, effort: f32, collision: bool) -> f32 {
        let collision_penalty = if collision { self.collision } else { 0.0 };
        self.progress * progress_delta - self.energy * effort - collision_penalty - self.time
    }
}

/// Progress proxy: open path ahead means progress
#[inline]
pub fn progress(center_risk: f32) -> f32 {
    (1.0 - center_risk).max(0.0)
}
