//! Mock transport for testing

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory duplex stream.
///
/// Clones share the same buffers, so a test can hand one clone to a
/// `Connection` and keep another to inject responses and inspect what was
/// written. Reads deliver at most `chunk_size` bytes per call to exercise
/// partial-read handling.
#[derive(Clone)]
pub struct MockStream {
    inner: Arc<Mutex<MockStreamInner>>,
}

struct MockStreamInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
    chunk_size: usize,
    /// Report `WouldBlock` instead of EOF when the read buffer is empty
    idle_timeouts: bool,
    reads: usize,
}

impl MockStream {
    /// Create a new mock stream with unbounded read chunks
    pub fn new() -> Self {
        Self::with_chunk_size(usize::MAX)
    }

    /// Create a mock stream that returns at most `chunk_size` bytes per read
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        MockStream {
            inner: Arc::new(Mutex::new(MockStreamInner {
                read_buffer: VecDeque::new(),
                write_buffer: Vec::new(),
                chunk_size: chunk_size.max(1),
                idle_timeouts: false,
                reads: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockStreamInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        self.lock().read_buffer.extend(data);
    }

    /// Get all written data
    pub fn written(&self) -> Vec<u8> {
        self.lock().write_buffer.clone()
    }

    /// Clear written data
    pub fn clear_written(&self) {
        self.lock().write_buffer.clear();
    }

    /// Bytes still waiting to be read
    pub fn pending_read(&self) -> usize {
        self.lock().read_buffer.len()
    }

    /// Number of `read` calls served so far
    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    /// Make an empty read buffer behave like a socket read timeout
    pub fn set_idle_timeouts(&self, enabled: bool) {
        self.lock().idle_timeouts = enabled;
    }
}

impl Read for MockStream {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.lock();
        inner.reads += 1;

        if inner.read_buffer.is_empty() && inner.idle_timeouts && !buffer.is_empty() {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "no data"));
        }

        let available = inner
            .read_buffer
            .len()
            .min(buffer.len())
            .min(inner.chunk_size);
        for (slot, byte) in buffer
            .iter_mut()
            .zip(inner.read_buffer.drain(..available))
        {
            *slot = byte;
        }
        Ok(available)
    }
}

impl Write for MockStream {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.lock().write_buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for MockStream {
    fn default() -> Self {
        Self::new()
    }
}
