//! Keyboard teleoperation mapping
//!
//! ```text
//!   q  w  e        hard-left  forward  hard-right
//!   a  s  d        left       stop     right
//!   space: stop    x: quit
//! ```

use rover_bridge::WheelCommand;

/// Drive commands a teleop key can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Drive {
    #[default]
    Stop,
    Forward,
    Left,
    Right,
    HardLeft,
    HardRight,
}

impl Drive {
    /// Wheel velocities (rad/s) for this drive command
    pub fn command(self) -> WheelCommand {
        match self {
            Drive::Stop => WheelCommand::STOP,
            Drive::Forward => WheelCommand::new(2.5, 2.5),
            Drive::Left => WheelCommand::new(0.5, 2.0),
            Drive::Right => WheelCommand::new(2.0, 0.5),
            Drive::HardLeft => WheelCommand::new(-3.0, 3.0),
            Drive::HardRight => WheelCommand::new(3.0, -3.0),
        }
    }
}

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Drive(Drive),
    Quit,
}

/// Map a key to its action; unknown keys map to `None`
pub fn parse_key(key: char) -> Option<KeyAction> {
    let action = match key.to_ascii_lowercase() {
        'w' => KeyAction::Drive(Drive::Forward),
        'a' => KeyAction::Drive(Drive::Left),
        'd' => KeyAction::Drive(Drive::Right),
        'q' => KeyAction::Drive(Drive::HardLeft),
        'e' => KeyAction::Drive(Drive::HardRight),
        's' | ' ' => KeyAction::Drive(Drive::Stop),
        'x' => KeyAction::Quit,
        _ => return None,
    };
    Some(action)
}

/// Actions for every recognized key in a line of input, in order
pub fn parse_line(line: &str) -> impl Iterator<Item = KeyAction> + '_ {
    line.chars().filter_map(parse_key)
}
