//! Core abstractions for the rover bridge

pub mod backend;
pub mod types;

pub use backend::BridgeBackend;
pub use types::{BGR_CHANNELS, Frame, WheelCommand};
