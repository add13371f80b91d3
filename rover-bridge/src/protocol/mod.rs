//! Bridge wire protocol: text commands and binary frame responses

pub mod command;
pub mod wire;

pub use command::Command;
pub use wire::{
    FRAME_HEADER_LEN, MAX_COMMAND_LEN, MAX_FRAME_BYTES, poll_command, read_command, read_frame,
    read_full, write_command, write_frame,
};
