//! Wire framing for the simulator bridge
//!
//! # Wire Format
//!
//! Commands (client → simulator) use a length-prefixed text frame:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (variable)       │
//! │ Big-endian u32   │ UTF-8 command text       │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! Frame responses (simulator → client) to `GET_FRAME` and `RESET`:
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────────────────────────┐
//! │ H (u32)  │ W (u32)  │ C (u32)  │ H*W*C bytes, BGR, row-major  │
//! └──────────┴──────────┴──────────┴──────────────────────────────┘
//! ```
//!
//! All integers are big-endian. `SET_V` has no response.
//!
//! ## Partial reads
//!
//! A stream read may return fewer bytes than requested. Every read here
//! accumulates until the exact byte count has arrived; a stream that ends
//! first is a [`ProtocolError::Closed`], which is fatal to the connection.
//!
//! ## Limits
//!
//! - **Command payload**: 1MB (1,048,576 bytes)
//! - **Frame payload**: 64MB; zero-sized frames are rejected

use crate::core::types::Frame;
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::command::Command;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// Length of the frame response header (H, W, C)
pub const FRAME_HEADER_LEN: usize = 12;

/// Maximum accepted command payload
pub const MAX_COMMAND_LEN: usize = 1024 * 1024;

/// Maximum accepted pixel payload
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Read exactly `buf.len()` bytes, looping over short reads.
///
/// A stream that ends early yields [`ProtocolError::Closed`] with the number
/// of bytes that did arrive. `Interrupted` reads are retried; every other
/// I/O error (including read timeouts) is returned as a connection error.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(ProtocolError::Closed {
                    expected: buf.len(),
                    received: filled,
                }
                .into());
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Connection(e)),
        }
    }
    Ok(())
}

/// Like [`read_full`], but a read timeout before the first byte reports
/// `Ok(false)` so a server loop can poll its shutdown flag.
///
/// Once any byte has arrived the read is committed and continues as
/// [`read_committed`].
pub fn read_full_or_idle<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    running: &AtomicBool,
) -> Result<bool> {
    if buf.is_empty() {
        return Ok(true);
    }
    loop {
        match reader.read(buf) {
            Ok(0) => {
                return Err(ProtocolError::Closed {
                    expected: buf.len(),
                    received: 0,
                }
                .into());
            }
            Ok(n) => {
                read_committed(reader, buf, n, running)?;
                return Ok(true);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if is_timeout(&e) => return Ok(false),
            Err(e) => return Err(Error::Connection(e)),
        }
    }
}

/// Fill `buf[filled..]` for a message that has already started.
///
/// Read timeouts are retried for as long as `running` stays set, so a slow
/// peer never leaves the stream mid-message. Once the flag is cleared the
/// next timeout yields [`ProtocolError::Abandoned`].
pub fn read_committed<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    mut filled: usize,
    running: &AtomicBool,
) -> Result<()> {
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(ProtocolError::Closed {
                    expected: buf.len(),
                    received: filled,
                }
                .into());
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if is_timeout(&e) => {
                if !running.load(Ordering::Relaxed) {
                    return Err(ProtocolError::Abandoned {
                        expected: buf.len(),
                        received: filled,
                    }
                    .into());
                }
            }
            Err(e) => return Err(Error::Connection(e)),
        }
    }
    Ok(())
}

#[inline]
fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// Write one length-prefixed command and flush.
pub fn write_command<W: Write + ?Sized>(writer: &mut W, command: &Command) -> Result<()> {
    let payload = command.encode()?;
    let len = payload.len() as u32;

    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(payload.as_bytes());

    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

/// Read one length-prefixed command (blocking).
pub fn read_command<R: Read + ?Sized>(reader: &mut R) -> Result<Command> {
    let mut len_buf = [0u8; 4];
    read_full(reader, &mut len_buf)?;
    let mut payload = vec![0u8; command_len(len_buf)?];
    read_full(reader, &mut payload)?;
    decode_command(&payload)
}

/// Read one command, returning `Ok(None)` if the read timed out before a
/// new message started.
///
/// A command that has started arriving is read to the end across any
/// number of timeouts while `running` is set.
pub fn poll_command<R: Read + ?Sized>(
    reader: &mut R,
    running: &AtomicBool,
) -> Result<Option<Command>> {
    let mut len_buf = [0u8; 4];
    if !read_full_or_idle(reader, &mut len_buf, running)? {
        return Ok(None);
    }
    let mut payload = vec![0u8; command_len(len_buf)?];
    read_committed(reader, &mut payload, 0, running)?;
    decode_command(&payload).map(Some)
}

fn command_len(len_buf: [u8; 4]) -> Result<usize> {
    let len = u32::from_be_bytes(len_buf) as usize;

    // Sanity check on length
    if len > MAX_COMMAND_LEN {
        return Err(ProtocolError::CommandTooLarge {
            len,
            limit: MAX_COMMAND_LEN,
        }
        .into());
    }
    Ok(len)
}

fn decode_command(payload: &[u8]) -> Result<Command> {
    let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)?;
    Command::parse(text)
}

/// Write a frame response (12-byte header + pixel buffer) and flush.
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, frame: &Frame) -> Result<()> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    header[0..4].copy_from_slice(&frame.height().to_be_bytes());
    header[4..8].copy_from_slice(&frame.width().to_be_bytes());
    header[8..12].copy_from_slice(&frame.channels().to_be_bytes());

    writer.write_all(&header)?;
    writer.write_all(frame.data())?;
    writer.flush()?;
    Ok(())
}

/// Read a frame response: exactly 12 header bytes, then exactly H*W*C bytes.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> Result<Frame> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    read_full(reader, &mut header)?;

    let height = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let width = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    let channels = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);

    let bytes = height as u64 * width as u64 * channels as u64;
    if bytes == 0 {
        return Err(ProtocolError::EmptyFrame {
            height,
            width,
            channels,
        }
        .into());
    }
    if bytes > MAX_FRAME_BYTES as u64 {
        return Err(ProtocolError::FrameTooLarge {
            bytes,
            limit: MAX_FRAME_BYTES,
        }
        .into());
    }

    let mut data = vec![0u8; bytes as usize];
    read_full(reader, &mut data)?;
    Frame::new(height, width, channels, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::WheelCommand;
    use crate::transport::MockStream;

    fn gradient_frame(h: u32, w: u32, c: u32) -> Frame {
        let data = (0..h * w * c).map(|i| (i % 251) as u8).collect();
        Frame::new(h, w, c, data).unwrap()
    }

    #[test]
    fn test_command_framing_bytes() {
        let mut out = Vec::new();
        write_command(&mut out, &Command::GetFrame).unwrap();
        assert_eq!(&out[..4], &9u32.to_be_bytes());
        assert_eq!(&out[4..], b"GET_FRAME");
    }

    #[test]
    fn test_command_round_trip_one_byte_chunks() {
        let mut out = Vec::new();
        let cmd = Command::SetVelocity(WheelCommand::new(0.5, 2.0));
        write_command(&mut out, &cmd).unwrap();

        let mut stream = MockStream::with_chunk_size(1);
        stream.inject_read(&out);
        assert_eq!(read_command(&mut stream).unwrap(), cmd);
    }

    #[test]
    fn test_frame_round_trip_shapes() {
        for (h, w, c) in [(1, 1, 1), (3, 5, 3), (120, 160, 3), (7, 1, 4)] {
            let frame = gradient_frame(h, w, c);
            let mut out = Vec::new();
            write_frame(&mut out, &frame).unwrap();
            assert_eq!(out.len(), FRAME_HEADER_LEN + frame.byte_len());

            let mut stream = MockStream::new();
            stream.inject_read(&out);
            assert_eq!(read_frame(&mut stream).unwrap(), frame);
        }
    }

    #[test]
    fn test_frame_survives_single_byte_reads() {
        let frame = gradient_frame(6, 9, 3);
        let mut out = Vec::new();
        write_frame(&mut out, &frame).unwrap();

        let mut stream = MockStream::with_chunk_size(1);
        stream.inject_read(&out);
        let decoded = read_frame(&mut stream).unwrap();
        assert_eq!(decoded.data(), frame.data());
        assert!(stream.reads() >= out.len());
    }

    #[test]
    fn test_closed_mid_header() {
        let mut stream = MockStream::new();
        stream.inject_read(&[0, 0, 0, 2, 0]);
        let err = read_frame(&mut stream).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::Closed {
                expected: 12,
                received: 5
            })
        ));
    }

    #[test]
    fn test_closed_mid_payload() {
        let mut bytes = Vec::new();
        for v in [2u32, 2, 3] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        bytes.extend_from_slice(&[9; 7]);

        let mut stream = MockStream::with_chunk_size(3);
        stream.inject_read(&bytes);
        let err = read_frame(&mut stream).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::Closed {
                expected: 12,
                received: 7
            })
        ));
    }

    #[test]
    fn test_rejects_zero_and_oversized_frames() {
        let mut stream = MockStream::new();
        for v in [0u32, 160, 3] {
            stream.inject_read(&v.to_be_bytes());
        }
        assert!(matches!(
            read_frame(&mut stream),
            Err(Error::Protocol(ProtocolError::EmptyFrame { .. }))
        ));

        let mut stream = MockStream::new();
        for v in [u32::MAX, u32::MAX, 3] {
            stream.inject_read(&v.to_be_bytes());
        }
        assert!(matches!(
            read_frame(&mut stream),
            Err(Error::Protocol(ProtocolError::FrameTooLarge { .. }))
        ));
    }

    #[test]
    fn test_rejects_oversized_command() {
        let mut stream = MockStream::new();
        stream.inject_read(&((MAX_COMMAND_LEN as u32) + 1).to_be_bytes());
        assert!(matches!(
            read_command(&mut stream),
            Err(Error::Protocol(ProtocolError::CommandTooLarge { .. }))
        ));
    }

    #[test]
    fn test_rejects_non_utf8_command() {
        let mut stream = MockStream::new();
        stream.inject_read(&2u32.to_be_bytes());
        stream.inject_read(&[0xff, 0xfe]);
        assert!(matches!(
            read_command(&mut stream),
            Err(Error::Protocol(ProtocolError::InvalidUtf8))
        ));
    }

    #[test]
    fn test_poll_command_idle_on_timeout() {
        let running = AtomicBool::new(true);
        let mut stream = MockStream::new();
        stream.set_idle_timeouts(true);
        assert_eq!(poll_command(&mut stream, &running).unwrap(), None);

        let mut out = Vec::new();
        write_command(&mut out, &Command::Reset).unwrap();
        stream.inject_read(&out);
        assert_eq!(
            poll_command(&mut stream, &running).unwrap(),
            Some(Command::Reset)
        );
    }

    #[test]
    fn test_poll_command_waits_for_late_body() {
        let running = AtomicBool::new(true);
        let mut stream = MockStream::new();
        stream.set_idle_timeouts(true);
        stream.inject_read(&9u32.to_be_bytes());

        // Body shows up only after the reader has seen several timeouts
        let writer = stream.clone();
        let late = std::thread::spawn(move || {
            while writer.reads() < 5 {
                std::thread::yield_now();
            }
            writer.inject_read(b"GET_");
            let seen = writer.reads();
            while writer.reads() < seen + 5 {
                std::thread::yield_now();
            }
            writer.inject_read(b"FRAME");
        });

        assert_eq!(
            poll_command(&mut stream, &running).unwrap(),
            Some(Command::GetFrame)
        );
        late.join().unwrap();
        assert_eq!(stream.pending_read(), 0);
    }

    #[test]
    fn test_shutdown_abandons_partial_prefix() {
        let running = AtomicBool::new(false);
        let mut stream = MockStream::new();
        stream.set_idle_timeouts(true);
        stream.inject_read(&[0, 0]);

        let err = poll_command(&mut stream, &running).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::Abandoned {
                expected: 4,
                received: 2
            })
        ));
        assert!(!err.is_disconnect());
    }

    #[test]
    fn test_shutdown_abandons_partial_body() {
        let running = AtomicBool::new(false);
        let mut stream = MockStream::new();
        stream.set_idle_timeouts(true);
        stream.inject_read(&5u32.to_be_bytes());
        stream.inject_read(b"RES");

        assert!(matches!(
            poll_command(&mut stream, &running),
            Err(Error::Protocol(ProtocolError::Abandoned {
                expected: 5,
                received: 3
            }))
        ));
    }

    #[test]
    fn test_clean_close_between_commands_is_disconnect() {
        let mut stream = MockStream::new();
        let err = read_command(&mut stream).unwrap_err();
        assert!(err.is_disconnect());
    }
}
