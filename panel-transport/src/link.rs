//! Byte link to the panel MCU
//!
//! [`PanelLink`] is the seam between the controller runtime and the device.
//! The FIFO backend lives in [`crate::fifo`]; [`MemoryLink`] is an in-process
//! backend driven through a [`MemoryPeer`], used by tests and dry runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;
use crate::guarded::Guarded;

/// A bidirectional line-oriented link to the panel
///
/// Implementations are owned by a single reader thread, so methods take
/// `&mut self`.
pub trait PanelLink: Send {
    /// Read one line, including the trailing delimiter
    ///
    /// Blocks for at most the link's poll timeout.
    ///
    /// # Returns
    /// `Err(TransportError::EmptyBuffer)` when no complete line is available
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Write the whole buffer in one go
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Human-readable description for log messages
    fn describe(&self) -> String;
}

impl<L: PanelLink + ?Sized> PanelLink for Box<L> {
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        (**self).read_line()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write_all(bytes)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[derive(Default)]
struct MemoryState {
    inbound: Guarded<VecDeque<Vec<u8>>>,
    written: Guarded<Vec<Vec<u8>>>,
    fail_writes: AtomicBool,
    disconnected: AtomicBool,
}

/// In-memory [`PanelLink`]
pub struct MemoryLink {
    state: Arc<MemoryState>,
    poll_timeout: Duration,
}

/// Test-side handle of a [`MemoryLink`]
#[derive(Clone)]
pub struct MemoryPeer {
    state: Arc<MemoryState>,
}

impl MemoryLink {
    /// Create a link and the peer that feeds it
    pub fn pair(poll_timeout: Duration) -> (Self, MemoryPeer) {
        let state = Arc::new(MemoryState::default());
        let link = Self {
            state: Arc::clone(&state),
            poll_timeout,
        };
        (link, MemoryPeer { state })
    }
}

impl PanelLink for MemoryLink {
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        if self.state.disconnected.load(Ordering::Acquire) {
            return Err(TransportError::Disconnected);
        }
        match self.state.inbound.apply(|q| q.pop_front()) {
            Some(line) => Ok(line),
            None => {
                std::thread::sleep(self.poll_timeout);
                Err(TransportError::EmptyBuffer)
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.state.fail_writes.load(Ordering::Acquire) {
            return Err(TransportError::ShortWrite {
                expected: bytes.len(),
                written: 0,
            });
        }
        self.state.written.apply(|w| w.push(bytes.to_vec()));
        Ok(())
    }

    fn describe(&self) -> String {
        "memory link".to_string()
    }
}

impl MemoryPeer {
    /// Queue a line for the reader; it is delivered exactly as given
    pub fn push_line(&self, line: impl Into<Vec<u8>>) {
        let line = line.into();
        self.state.inbound.apply(|q| q.push_back(line));
    }

    /// Number of lines not yet consumed by the reader
    pub fn pending(&self) -> usize {
        self.state.inbound.apply(|q| q.len())
    }

    /// Every buffer written so far, one entry per `write_all` call
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.written.apply(|w| w.clone())
    }

    /// All written bytes, concatenated
    pub fn written_bytes(&self) -> Vec<u8> {
        self.state.written.apply(|w| w.concat())
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.fail_writes.store(fail, Ordering::Release);
    }

    pub fn disconnect(&self) {
        self.state.disconnected.store(true, Ordering::Release);
    }

    /// Undo [`disconnect`](Self::disconnect); queued lines are delivered again
    pub fn reconnect(&self) {
        self.state.disconnected.store(false, Ordering::Release);
    }
}
