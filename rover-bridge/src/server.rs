//! Simulator-side bridge server
//!
//! # Connection Lifecycle
//!
//! ```text
//! 1. Client connects to TCP port (default 5555)
//! 2. Server spawns a handler thread for this client
//! 3. Handler reads one command, serves it under the backend lock,
//!    writes the frame response (if any), then reads the next command
//! 4. Loop ends on disconnect, protocol violation, or shutdown
//! ```
//!
//! Several clients may be connected at once (e.g. HUD next to teleop).
//! Their requests interleave but each one is served atomically.
//!
//! # Safety Features
//!
//! - **Read timeout**: 500ms timeout allows periodic shutdown flag checks
//! - **Slow clients**: A command that has started arriving is awaited across
//!   timeouts until it completes or shutdown begins
//! - **Buffer limit**: Commands > 1MB are rejected
//! - **Fatal violations**: A malformed command closes that connection only

use crate::core::backend::BridgeBackend;
use crate::core::types::Frame;
use crate::error::Result;
use crate::protocol::{Command, poll_command, write_frame};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handler read timeout, bounds how long shutdown waits on an idle client
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Accept loop sleep when no connection is pending
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// TCP front end that exposes a [`BridgeBackend`] to bridge clients
pub struct BridgeServer<B: BridgeBackend + 'static> {
    listener: TcpListener,
    backend: Arc<Mutex<B>>,
    running: Arc<AtomicBool>,
}

impl<B: BridgeBackend + 'static> BridgeServer<B> {
    /// Bind the listening socket.
    ///
    /// `running` is the shared shutdown flag; clearing it stops the accept
    /// loop and every handler within one read timeout.
    pub fn bind<A: ToSocketAddrs>(
        addr: A,
        backend: Arc<Mutex<B>>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        if let Err(e) = listener.set_nonblocking(true) {
            log::warn!("Failed to set nonblocking mode: {}", e);
        }
        Ok(Self {
            listener,
            backend,
            running,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop until the running flag is cleared.
    ///
    /// Handler threads are joined before returning.
    pub fn run(&self) -> Result<()> {
        log::info!("Bridge listening on {}", self.local_addr()?);
        let mut handlers: Vec<JoinHandle<()>> = Vec::new();

        while self.running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    log::info!("Bridge client connected: {}", addr);
                    match self.spawn_handler(stream, addr) {
                        Ok(handle) => handlers.push(handle),
                        Err(e) => log::error!("Failed to start handler for {}: {}", addr, e),
                    }
                    handlers.retain(|h| !h.is_finished());
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    log::error!("Accept error: {}", e);
                }
            }
        }

        log::info!("Bridge shutting down ({} open clients)", handlers.len());
        for handle in handlers {
            if handle.join().is_err() {
                log::error!("Bridge handler panicked");
            }
        }
        Ok(())
    }

    fn spawn_handler(&self, stream: TcpStream, addr: SocketAddr) -> Result<JoinHandle<()>> {
        // Accepted sockets inherit nonblocking mode on some platforms
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;

        let backend = Arc::clone(&self.backend);
        let running = Arc::clone(&self.running);
        let handle = thread::Builder::new()
            .name(format!("bridge-{}", addr))
            .spawn(move || {
                let mut stream = stream;
                if let Err(e) = serve_connection(&mut stream, &backend, &running) {
                    log::error!("Bridge client {} dropped: {}", addr, e);
                }
                let _ = stream.shutdown(Shutdown::Both);
                log::info!("Bridge client disconnected: {}", addr);
            })?;
        Ok(handle)
    }
}

/// Serve one client until it disconnects or the running flag is cleared.
///
/// A clean close between commands returns `Ok(())`. Any protocol violation
/// or backend failure is returned; the caller must drop the stream.
pub fn serve_connection<S, B>(stream: &mut S, backend: &Mutex<B>, running: &AtomicBool) -> Result<()>
where
    S: Read + Write,
    B: BridgeBackend,
{
    while running.load(Ordering::Relaxed) {
        match poll_command(stream, running) {
            Ok(Some(command)) => {
                log::debug!("Bridge command: {}", command);
                if let Some(frame) = handle_command(backend, command)? {
                    write_frame(stream, &frame)?;
                }
            }
            Ok(None) => {
                // Read timeout, re-check the running flag
            }
            Err(e) if e.is_disconnect() => return Ok(()),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Apply one command to the backend. Returns the frame to send back, if any.
pub fn handle_command<B: BridgeBackend>(
    backend: &Mutex<B>,
    command: Command,
) -> Result<Option<Frame>> {
    let mut backend = lock(backend);
    match command {
        Command::GetFrame => backend.capture().map(Some),
        Command::Reset => {
            log::info!("Bridge reset requested");
            backend.reset().map(Some)
        }
        Command::SetVelocity(wheels) => {
            backend.set_wheel_velocity(wheels)?;
            Ok(None)
        }
    }
}

fn lock<B>(backend: &Mutex<B>) -> MutexGuard<'_, B> {
    backend.lock().unwrap_or_else(|e| e.into_inner())
}
