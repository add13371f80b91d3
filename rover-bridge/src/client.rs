//! Bridge client connection.
//!
//! One [`Connection`] owns one stream and speaks the half-duplex
//! request/response protocol: at most one request is outstanding, and a
//! request that expects a frame must be answered before the next command
//! is sent.
//!
//! # Example
//!
//! ```ignore
//! use rover_bridge::Connection;
//!
//! let mut conn = Connection::connect("127.0.0.1:5555")?;
//! let first = conn.reset()?;
//! conn.set_velocity(2.5, 2.5)?;
//! let next = conn.get_frame()?;
//! println!("{}x{} frame", next.width(), next.height());
//! ```

use crate::config::ClientConfig;
use crate::core::types::Frame;
use crate::error::{ProtocolError, Result};
use crate::protocol::{Command, read_frame, write_command};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// Client side of a bridge connection
pub struct Connection<S = TcpStream> {
    stream: S,
    /// Slept before every outbound command (robustness testing)
    command_latency: Duration,
    /// Keyword of the request whose frame response is still unread
    pending: Option<&'static str>,
    /// Set once a send or receive failed part way; the stream is unusable
    broken: bool,
}

impl Connection<TcpStream> {
    /// Connect to the simulator bridge.
    pub fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        // Commands are tiny; don't let Nagle hold them back
        stream.set_nodelay(true)?;
        log::debug!("Connected to bridge at {}", addr);
        Ok(Self::from_stream(stream))
    }

    /// Connect using a client configuration (address, latency, timeout).
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut conn = Self::connect(&config.address())?;
        conn.set_timeout(config.read_timeout())?;
        Ok(conn.with_command_latency(config.command_latency()))
    }

    /// Set read timeout for the connection.
    ///
    /// Pass `None` to disable timeout (blocking reads). A timeout that fires
    /// mid-frame surfaces as a connection error.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Get the peer address of this connection.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }
}

impl<S: Read + Write> Connection<S> {
    /// Wrap an already-open stream.
    pub fn from_stream(stream: S) -> Self {
        Self {
            stream,
            command_latency: Duration::ZERO,
            pending: None,
            broken: false,
        }
    }

    /// Add artificial latency before every command.
    pub fn with_command_latency(mut self, latency: Duration) -> Self {
        self.command_latency = latency;
        self
    }

    #[inline]
    pub fn command_latency(&self) -> Duration {
        self.command_latency
    }

    /// True while a frame response is owed by the simulator
    #[inline]
    pub fn awaiting_response(&self) -> bool {
        self.pending.is_some()
    }

    /// True after a transport or framing failure. Every later command
    /// fails with [`ProtocolError::Desynced`]; reconnect instead.
    #[inline]
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Send one command.
    ///
    /// Fails with [`ProtocolError::ResponsePending`] if the previous request's
    /// frame has not been received yet.
    pub fn send_command(&mut self, command: &Command) -> Result<()> {
        if self.broken {
            return Err(ProtocolError::Desynced.into());
        }
        if let Some(pending) = self.pending {
            return Err(ProtocolError::ResponsePending {
                pending,
                next: command.keyword(),
            }
            .into());
        }

        // Validation errors happen before any byte is written
        let payload = command.encode()?;

        if !self.command_latency.is_zero() {
            std::thread::sleep(self.command_latency);
        }

        log::trace!("-> {}", payload);
        if let Err(e) = write_command(&mut self.stream, command) {
            self.broken = true;
            return Err(e);
        }

        if command.expects_frame() {
            self.pending = Some(command.keyword());
        }
        Ok(())
    }

    /// Receive one frame response (blocking).
    pub fn receive_frame(&mut self) -> Result<Frame> {
        if self.broken {
            return Err(ProtocolError::Desynced.into());
        }
        // The response is consumed (or the stream is broken) either way
        self.pending = None;
        let frame = read_frame(&mut self.stream).inspect_err(|_| self.broken = true)?;
        log::trace!(
            "<- frame {}x{}x{}",
            frame.height(),
            frame.width(),
            frame.channels()
        );
        Ok(frame)
    }

    /// Request and receive the current camera frame.
    pub fn get_frame(&mut self) -> Result<Frame> {
        self.send_command(&Command::GetFrame)?;
        self.receive_frame()
    }

    /// Reset the simulated episode and receive the first frame.
    pub fn reset(&mut self) -> Result<Frame> {
        self.send_command(&Command::Reset)?;
        self.receive_frame()
    }

    /// Set wheel velocities. No response is read.
    pub fn set_velocity(&mut self, left: f32, right: f32) -> Result<()> {
        self.send_command(&Command::set_velocity(left, right)?)
    }

    /// Access the underlying stream
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Consume the connection and return the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::protocol::{read_command, write_frame};
    use crate::transport::MockStream;

    fn frame_bytes(frame: &Frame) -> Vec<u8> {
        let mut out = Vec::new();
        write_frame(&mut out, frame).unwrap();
        out
    }

    fn sent_commands(stream: &MockStream) -> Vec<Command> {
        let mut reader = MockStream::new();
        reader.inject_read(&stream.written());
        let mut commands = Vec::new();
        while reader.pending_read() > 0 {
            commands.push(read_command(&mut reader).unwrap());
        }
        commands
    }

    #[test]
    fn test_set_velocity_then_get_frame() {
        let stream = MockStream::with_chunk_size(5);
        let frame = Frame::filled(4, 6, [10, 20, 30]).unwrap();
        stream.inject_read(&frame_bytes(&frame));

        let mut conn = Connection::from_stream(stream.clone());
        conn.set_velocity(1.0, 1.0).unwrap();
        assert!(!conn.awaiting_response());
        assert_eq!(conn.get_frame().unwrap(), frame);

        assert_eq!(
            sent_commands(&stream),
            vec![Command::set_velocity(1.0, 1.0).unwrap(), Command::GetFrame]
        );
        assert_eq!(stream.pending_read(), 0);
    }

    #[test]
    fn test_second_request_before_response_is_rejected() {
        let stream = MockStream::new();
        let mut conn = Connection::from_stream(stream.clone());

        conn.send_command(&Command::Reset).unwrap();
        let err = conn.send_command(&Command::GetFrame).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::ResponsePending {
                pending: "RESET",
                next: "GET_FRAME"
            })
        ));
        // SET_V is a command too and must also wait
        assert!(conn.set_velocity(0.0, 0.0).is_err());
        assert_eq!(sent_commands(&stream), vec![Command::Reset]);
    }

    #[test]
    fn test_reset_returns_frame() {
        let stream = MockStream::new();
        let frame = Frame::filled(2, 3, [0, 0, 255]).unwrap();
        stream.inject_read(&frame_bytes(&frame));

        let mut conn = Connection::from_stream(stream.clone());
        assert_eq!(conn.reset().unwrap(), frame);
        assert_eq!(sent_commands(&stream), vec![Command::Reset]);
    }

    #[test]
    fn test_stream_closed_before_response() {
        let mut conn = Connection::from_stream(MockStream::new());
        let err = conn.get_frame().unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::Closed { received: 0, .. })
        ));
        assert!(!conn.awaiting_response());
    }

    #[test]
    fn test_non_finite_velocity_never_hits_the_wire() {
        let stream = MockStream::new();
        let mut conn = Connection::from_stream(stream.clone());
        assert!(conn.set_velocity(f32::NAN, 1.0).is_err());
        assert!(stream.written().is_empty());
    }

    #[test]
    fn test_truncated_frame_breaks_connection() {
        let stream = MockStream::new();
        let frame = Frame::filled(2, 2, [1, 2, 3]).unwrap();
        let bytes = frame_bytes(&frame);
        stream.inject_read(&bytes[..bytes.len() - 4]);

        let mut conn = Connection::from_stream(stream.clone());
        assert!(matches!(
            conn.get_frame(),
            Err(Error::Protocol(ProtocolError::Closed { .. }))
        ));
        assert!(conn.is_broken());

        stream.clear_written();
        stream.inject_read(&bytes);
        for result in [conn.set_velocity(1.0, 1.0).map(|_| ()), conn.get_frame().map(|_| ())] {
            assert!(matches!(
                result,
                Err(Error::Protocol(ProtocolError::Desynced))
            ));
        }
        assert!(conn.receive_frame().is_err());
        assert!(stream.written().is_empty());
    }

    #[test]
    fn test_rejected_command_leaves_connection_usable() {
        let stream = MockStream::new();
        stream.inject_read(&frame_bytes(&Frame::filled(1, 1, [0, 0, 0]).unwrap()));

        let mut conn = Connection::from_stream(stream.clone());
        let bad = Command::SetVelocity(crate::core::types::WheelCommand::new(f32::INFINITY, 0.0));
        assert!(conn.send_command(&bad).is_err());
        assert!(!conn.is_broken());
        assert!(stream.written().is_empty());
        assert!(conn.get_frame().is_ok());
    }
}
