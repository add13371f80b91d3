//! Environment configuration
//!
//! ```toml
//! frame_width = 160
//! frame_height = 120
//! action_mode = "continuous"
//! collision_threshold = 0.9
//!
//! [bridge]
//! host = "127.0.0.1"
//! port = 5555
//! command_latency_ms = 20
//!
//! [reward]
//! collision = 10.0
//!
//! [termination]
//! max_episode_steps = 500
//!
//! [risk]
//! canny_low = 50.0
//! ```

use crate::action::ActionMode;
use crate::episode::TerminationPolicy;
use crate::error::{EnvError, Result};
use crate::reward::RewardWeights;
use rover_bridge::ClientConfig;
use rover_bridge::config::parse_var;
use rover_perception::EdgeRiskConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything needed to build a [`RoverEnv`](crate::RoverEnv)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Observation width (pixels)
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,

    /// Observation height (pixels)
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,

    #[serde(default)]
    pub action_mode: ActionMode,

    /// Center risk above which a step counts as a collision
    #[serde(default = "default_collision_threshold")]
    pub collision_threshold: f32,

    /// Lower bound on the per-step progress delta
    #[serde(default = "default_progress_floor")]
    pub progress_floor: f32,

    #[serde(default)]
    pub bridge: ClientConfig,

    #[serde(default)]
    pub reward: RewardWeights,

    #[serde(default)]
    pub termination: TerminationPolicy,

    #[serde(default)]
    pub risk: EdgeRiskConfig,
}

fn default_frame_width() -> u32 {
    160
}
fn default_frame_height() -> u32 {
    120
}
fn default_collision_threshold() -> f32 {
    0.9
}
fn default_progress_floor() -> f32 {
    -0.1
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            action_mode: ActionMode::default(),
            collision_threshold: default_collision_threshold(),
            progress_floor: default_progress_floor(),
            bridge: ClientConfig::default(),
            reward: RewardWeights::default(),
            termination: TerminationPolicy::default(),
            risk: EdgeRiskConfig::default(),
        }
    }
}

impl EnvConfig {
    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EnvError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EnvConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `ROVER_HOST`, `ROVER_PORT`, `ROVER_LATENCY_MS`,
    /// `FRAME_W`, `FRAME_H` and `ROVER_ACTION_MODE`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            bridge: ClientConfig::from_lookup(&lookup).map_err(config_error)?,
            ..Self::default()
        };
        if let Some(width) = lookup("FRAME_W") {
            config.frame_width = parse_var("FRAME_W", &width).map_err(config_error)?;
        }
        if let Some(height) = lookup("FRAME_H") {
            config.frame_height = parse_var("FRAME_H", &height).map_err(config_error)?;
        }
        if let Some(mode) = lookup("ROVER_ACTION_MODE") {
            config.action_mode = mode.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_width < 3 || self.frame_height == 0 {
            return Err(EnvError::Configuration(format!(
                "observation must be at least 3 pixels wide and 1 high, got {}x{}",
                self.frame_width, self.frame_height
            )));
        }
        if !(self.collision_threshold.is_finite() && self.collision_threshold >= 0.0) {
            return Err(EnvError::Configuration(
                "collision_threshold must be >= 0".to_string(),
            ));
        }
        if !(self.progress_floor.is_finite() && self.progress_floor <= 0.0) {
            return Err(EnvError::Configuration(
                "progress_floor must be <= 0".to_string(),
            ));
        }
        self.risk.validate()?;
        Ok(())
    }
}

fn config_error(e: rover_bridge::Error) -> EnvError {
    EnvError::Configuration(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EnvConfig::from_toml("").unwrap();
        assert_eq!(config, EnvConfig::default());
        assert_eq!((config.frame_height, config.frame_width), (120, 160));
        assert_eq!(config.action_mode, ActionMode::Discrete);
        assert_eq!(config.bridge.address(), "127.0.0.1:5555");
        assert_eq!(config.reward.collision, 20.0);
        assert_eq!(config.termination.collision_patience, 5);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = EnvConfig::from_toml(include_str!("../rover-env.toml")).unwrap();
        assert_eq!(config, EnvConfig::default());
    }

    #[test]
    fn test_from_env() {
        let config = EnvConfig::from_lookup(lookup(&[
            ("ROVER_HOST", "10.0.0.7"),
            ("ROVER_PORT", "6000"),
            ("FRAME_W", "320"),
            ("FRAME_H", "240"),
            ("ROVER_ACTION_MODE", "continuous"),
        ]))
        .unwrap();
        assert_eq!(config.bridge.address(), "10.0.0.7:6000");
        assert_eq!((config.frame_width, config.frame_height), (320, 240));
        assert_eq!(config.action_mode, ActionMode::Continuous);
    }

    #[test]
    fn test_env_errors_are_configuration_errors() {
        for vars in [
            [("FRAME_W", "wide")],
            [("ROVER_PORT", "99999")],
            [("ROVER_ACTION_MODE", "box")],
            [("FRAME_W", "2")],
        ] {
            let err = EnvConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, EnvError::Configuration(_)), "{:?}", vars);
        }
    }

    #[test]
    fn test_toml_sections() {
        let config = EnvConfig::from_toml(
            r#"
            action_mode = "continuous"
            progress_floor = -0.2

            [bridge]
            port = 7000
            command_latency_ms = 15

            [reward]
            collision = 10.0

            [termination]
            max_episode_steps = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.action_mode, ActionMode::Continuous);
        assert_eq!(config.progress_floor, -0.2);
        assert_eq!(config.bridge.port, 7000);
        assert_eq!(config.bridge.command_latency_ms, 15);
        assert_eq!(config.reward.collision, 10.0);
        assert_eq!(config.reward.progress, 5.0);
        assert_eq!(config.termination.max_episode_steps, 0);
        assert_eq!(config.termination.collision_patience, 5);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.toml");
        std::fs::write(&path, "frame_width = 80\nframe_height = 60\n").unwrap();
        let config = EnvConfig::load(&path).unwrap();
        assert_eq!((config.frame_width, config.frame_height), (80, 60));

        assert!(EnvConfig::load(&dir.path().join("missing.toml")).is_err());
        std::fs::write(&path, "[risk]\ncanny_low = 200.0\ncanny_high = 100.0\n").unwrap();
        assert!(EnvConfig::load(&path).is_err());
    }
}
