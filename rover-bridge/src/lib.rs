//! Rover Bridge - request/response link between the rover simulator and
//! its clients
//!
//! Clients send length-prefixed text commands (`GET_FRAME`, `RESET`,
//! `SET_V <left> <right>`); the simulator answers frame requests with a
//! 12-byte header followed by raw BGR pixels.
//!
//! - [`Connection`]: client side (teleop, HUD, environment adapter)
//! - [`BridgeServer`]: simulator side, backed by a [`BridgeBackend`]
//! - [`MockStream`]: in-memory transport for tests

pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod server;
pub mod transport;

// Re-export commonly used types
pub use client::Connection;
pub use config::ClientConfig;
pub use core::{BGR_CHANNELS, BridgeBackend, Frame, WheelCommand};
pub use error::{Error, ProtocolError, Result};
pub use protocol::Command;
pub use server::BridgeServer;
pub use transport::MockStream;
