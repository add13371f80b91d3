//! Error types for rover perception

/// Result type alias
pub type Result<T> = std::result::Result<T, PerceptionError>;

/// Perception error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PerceptionError {
    /// A detector parameter is out of range
    #[error("Invalid perception config: {0}")]
    InvalidConfig(String),
}
