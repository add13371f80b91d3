//! BridgeBackend trait definition

use crate::core::types::{Frame, WheelCommand};
use crate::error::Result;

/// Simulator-side handler for bridge requests.
///
/// Each call runs to completion before the server reads the next request on
/// that connection, so implementations see commands in wire order.
pub trait BridgeBackend: Send {
    /// Current camera image
    fn capture(&mut self) -> Result<Frame>;

    /// Reset the episode/pose and return the first image after the reset
    fn reset(&mut self) -> Result<Frame>;

    /// Set wheel angular velocities. No response is sent to the client.
    fn set_wheel_velocity(&mut self, command: WheelCommand) -> Result<()>;
}
