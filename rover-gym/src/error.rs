//! Error types for the training environment

/// Result type alias
pub type Result<T> = std::result::Result<T, EnvError>;

/// Environment error types
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// Transport or protocol failure talking to the simulator.
    ///
    /// The connection is dropped; the next `reset()` reconnects.
    #[error("Connection error: {0}")]
    Connection(#[from] rover_bridge::Error),

    /// Invalid action, action kind or configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// `step()` called without an active episode
    #[error("No active episode: call reset() first")]
    EpisodeNotStarted,

    /// Simulator sent a frame that does not fit the observation space
    #[error("Observation shape {got:?} does not match {expected:?} (HxWxC)")]
    ObservationShape {
        expected: (u32, u32, u32),
        got: (u32, u32, u32),
    },
}

impl From<rover_perception::PerceptionError> for EnvError {
    fn from(e: rover_perception::PerceptionError) -> Self {
        EnvError::Configuration(e.to_string())
    }
}

impl From<toml::de::Error> for EnvError {
    fn from(e: toml::de::Error) -> Self {
        EnvError::Configuration(e.to_string())
    }
}
