//! Error types for the rover simulator

/// Result type alias
pub type Result<T> = std::result::Result<T, SimError>;

/// Simulator error types
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bridge transport or protocol failure
    #[error("Bridge error: {0}")]
    Bridge(#[from] rover_bridge::Error),

    /// Invalid detector parameters
    #[error("Perception error: {0}")]
    Perception(#[from] rover_perception::PerceptionError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for SimError {
    fn from(e: toml::de::Error) -> Self {
        SimError::Config(e.to_string())
    }
}
