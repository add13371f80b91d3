//! Text commands carried inside length-prefixed frames.
//!
//! Grammar (space separated, ASCII):
//!
//! ```text
//! GET_FRAME
//! RESET
//! SET_V <left> <right>
//! ```

use crate::core::types::WheelCommand;
use crate::error::{ProtocolError, Result};
use std::fmt;

const GET_FRAME: &str = "GET_FRAME";
const RESET: &str = "RESET";
const SET_V: &str = "SET_V";

/// A request from a bridge client to the simulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Request the current camera image
    GetFrame,
    /// Reset the simulated episode; answered with a frame
    Reset,
    /// Set left/right wheel angular velocities; no response
    SetVelocity(WheelCommand),
}

impl Command {
    /// Build a `SetVelocity`, rejecting NaN and infinities.
    pub fn set_velocity(left: f32, right: f32) -> Result<Self> {
        check_finite(left, right)?;
        Ok(Command::SetVelocity(WheelCommand::new(left, right)))
    }

    /// Wire keyword of this command
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::GetFrame => GET_FRAME,
            Command::Reset => RESET,
            Command::SetVelocity(_) => SET_V,
        }
    }

    /// Whether the simulator answers this command with a frame
    #[inline]
    pub fn expects_frame(&self) -> bool {
        !matches!(self, Command::SetVelocity(_))
    }

    /// Serialize to the UTF-8 command text.
    pub fn encode(&self) -> Result<String> {
        if let Command::SetVelocity(cmd) = self {
            check_finite(cmd.left, cmd.right)?;
        }
        Ok(self.to_string())
    }

    /// Parse command text received from the wire.
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();
        let keyword = tokens.next().unwrap_or_default();

        let command = match keyword {
            GET_FRAME => Command::GetFrame,
            RESET => Command::Reset,
            SET_V => {
                let left = parse_velocity(tokens.next(), "left")?;
                let right = parse_velocity(tokens.next(), "right")?;
                Command::set_velocity(left, right)?
            }
            _ => return Err(ProtocolError::UnknownCommand(text.to_string()).into()),
        };

        if let Some(extra) = tokens.next() {
            return Err(ProtocolError::InvalidArguments {
                command: command.keyword(),
                reason: format!("unexpected trailing token {:?}", extra),
            }
            .into());
        }
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Debug formatting keeps a decimal point ("1.0", not "1")
            Command::SetVelocity(cmd) => write!(f, "{} {:?} {:?}", SET_V, cmd.left, cmd.right),
            other => f.write_str(other.keyword()),
        }
    }
}

fn parse_velocity(token: Option<&str>, wheel: &str) -> Result<f32> {
    let token = token.ok_or_else(|| ProtocolError::InvalidArguments {
        command: SET_V,
        reason: format!("missing {} velocity", wheel),
    })?;
    token.parse::<f32>().map_err(|e| {
        ProtocolError::InvalidArguments {
            command: SET_V,
            reason: format!("{} velocity {:?}: {}", wheel, token, e),
        }
        .into()
    })
}

fn check_finite(left: f32, right: f32) -> Result<()> {
    if left.is_finite() && right.is_finite() {
        Ok(())
    } else {
        Err(ProtocolError::InvalidArguments {
            command: SET_V,
            reason: format!("non-finite velocity ({}, {})", left, right),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_encode_keywords() {
        assert_eq!(Command::GetFrame.encode().unwrap(), "GET_FRAME");
        assert_eq!(Command::Reset.encode().unwrap(), "RESET");
        assert_eq!(
            Command::set_velocity(1.0, -2.5).unwrap().encode().unwrap(),
            "SET_V 1.0 -2.5"
        );
    }

    #[test]
    fn test_parse_accepts_integer_and_decimal_floats() {
        assert_eq!(
            Command::parse("SET_V 1 0.5").unwrap(),
            Command::SetVelocity(WheelCommand::new(1.0, 0.5))
        );
        assert_eq!(
            Command::parse("  SET_V -3.0   3.0 ").unwrap(),
            Command::SetVelocity(WheelCommand::new(-3.0, 3.0))
        );
        assert_eq!(Command::parse("GET_FRAME").unwrap(), Command::GetFrame);
        assert_eq!(Command::parse("RESET\n").unwrap(), Command::Reset);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            Command::parse("FLY 1 2"),
            Err(Error::Protocol(ProtocolError::UnknownCommand(_)))
        ));
        assert!(matches!(
            Command::parse(""),
            Err(Error::Protocol(ProtocolError::UnknownCommand(_)))
        ));
        assert!(matches!(
            Command::parse("SET_V 1.0"),
            Err(Error::Protocol(ProtocolError::InvalidArguments { .. }))
        ));
        assert!(matches!(
            Command::parse("SET_V 1.0 fast"),
            Err(Error::Protocol(ProtocolError::InvalidArguments { .. }))
        ));
        assert!(matches!(
            Command::parse("SET_V 1.0 NaN"),
            Err(Error::Protocol(ProtocolError::InvalidArguments { .. }))
        ));
        assert!(matches!(
            Command::parse("GET_FRAME now"),
            Err(Error::Protocol(ProtocolError::InvalidArguments { .. }))
        ));
    }

    #[test]
    fn test_set_velocity_rejects_non_finite() {
        assert!(Command::set_velocity(f32::INFINITY, 0.0).is_err());
        let raw = Command::SetVelocity(WheelCommand::new(0.0, f32::NAN));
        assert!(raw.encode().is_err());
    }

    #[test]
    fn test_only_set_velocity_is_unanswered() {
        assert!(Command::GetFrame.expects_frame());
        assert!(Command::Reset.expects_frame());
        assert!(!Command::SetVelocity(WheelCommand::STOP).expects_frame());
    }
}
