//! Per-episode bookkeeping and termination.

use crate::reward::progress;
use serde::{Deserialize, Serialize};

/// State created by `reset()` and updated once per `step()`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeState {
    pub previous_progress: f32,
    /// Sum of `|vl| + |vr|` over the episode
    pub cumulative_energy: f32,
    /// True once any step of this episode saw a collision
    pub collided: bool,
    pub steps: u32,
    /// Consecutive colliding steps up to now
    pub collision_streak: u32,
}

impl EpisodeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress change since the previous step, floored at `floor`
    pub fn advance_progress(&mut self, center_risk: f32, floor: f32) -> f32 {
        let current = progress(center_risk);
        let delta = (current - self.previous_progress).max(floor);
        self.previous_progress = current;
        delta
    }

    /// Account for one step's wheel effort and collision outcome
    pub fn record_step(&mut self, effort: f32, collision: bool) {
        self.steps += 1;
        self.cumulative_energy += effort;
        self.collided |= collision;
        self.collision_streak = if collision {
            self.collision_streak + 1
        } else {
            0
        };
    }
}

/// When an episode ends.
///
/// `terminated` after `collision_patience` consecutive colliding steps,
/// `truncated` after `max_episode_steps`. Zero disables either check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationPolicy {
    #[serde(default = "default_collision_patience")]
    pub collision_patience: u32,

    #[serde(default = "default_max_episode_steps")]
    pub max_episode_steps: u32,
}

fn default_collision_patience() -> u32 {
    5
}
fn default_max_episode_steps() -> u32 {
    1000
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            collision_patience: default_collision_patience(),
            max_episode_steps: default_max_episode_steps(),
        }
    }
}

impl TerminationPolicy {
    /// Episodes never end on their own
    pub fn never() -> Self {
        Self {
            collision_patience: 0,
            max_episode_steps: 0,
        }
    }

    pub fn is_terminated(&self, episode: &EpisodeState) -> bool {
        self.collision_patience > 0 && episode.collision_streak >= self.collision_patience
    }

    pub fn is_truncated(&self, episode: &EpisodeState) -> bool {
        self.max_episode_steps > 0 && episode.steps >= self.max_episode_steps
    }
}
