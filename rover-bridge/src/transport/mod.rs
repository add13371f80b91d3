//! Transport layer for I/O abstraction
//!
//! Bridge code is generic over `Read + Write`; production uses
//! [`std::net::TcpStream`], tests use [`MockStream`].

mod mock;
pub use mock::MockStream;
