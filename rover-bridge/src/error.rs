//! Error types for the rover bridge

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure (connect, send, receive)
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Wire protocol violation; the connection must not be reused
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Simulator-side failure while serving a request
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// True when the peer closed the stream cleanly between two messages.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Error::Protocol(ProtocolError::Closed { received: 0, .. })
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Framing and payload violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Stream ended before the expected byte count arrived
    #[error("connection closed after {received} of {expected} bytes")]
    Closed {
        /// Bytes the reader was waiting for
        expected: usize,
        /// Bytes that actually arrived
        received: usize,
    },

    /// Frame header declared a zero dimension
    #[error("empty frame {height}x{width}x{channels}")]
    EmptyFrame {
        height: u32,
        width: u32,
        channels: u32,
    },

    /// Frame header declared more pixel bytes than allowed
    #[error("frame of {bytes} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { bytes: u64, limit: usize },

    /// Pixel buffer length disagrees with the declared dimensions
    #[error("pixel buffer has {actual} bytes, header declares {declared}")]
    SizeMismatch { declared: usize, actual: usize },

    /// Command length prefix above the accepted bound
    #[error("command of {len} bytes exceeds limit of {limit} bytes")]
    CommandTooLarge { len: usize, limit: usize },

    /// Command payload was not UTF-8
    #[error("command payload is not valid UTF-8")]
    InvalidUtf8,

    /// Command keyword not part of the grammar
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// Command keyword known but its arguments are malformed
    #[error("invalid arguments for {command}: {reason}")]
    InvalidArguments {
        command: &'static str,
        reason: String,
    },

    /// Server shutdown began while a message was partially received
    #[error("shutdown after {received} of {expected} bytes")]
    Abandoned { expected: usize, received: usize },

    /// An earlier transport or framing failure left the stream out of sync
    #[error("connection is out of sync after an earlier failure")]
    Desynced,

    /// A new request was issued while a frame response was still unread
    #[error("cannot send {next}: response to {pending} not yet received")]
    ResponsePending {
        pending: &'static str,
        next: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_only_on_clean_boundary() {
        let clean = Error::Protocol(ProtocolError::Closed {
            expected: 4,
            received: 0,
        });
        let torn = Error::Protocol(ProtocolError::Closed {
            expected: 12,
            received: 5,
        });
        assert!(clean.is_disconnect());
        assert!(!torn.is_disconnect());
    }

    #[test]
    fn test_error_messages_keep_cause() {
        let err = Error::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(err.to_string().contains("refused"));

        let err = Error::from(ProtocolError::FrameTooLarge {
            bytes: 1 << 40,
            limit: 64,
        });
        assert!(err.to_string().starts_with("Protocol error"));
    }
}
