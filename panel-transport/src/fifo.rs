//! FIFO device backend
//!
//! The panel MCU is exposed as a bidirectional character device that is read
//! one line at a time and written with raw command bytes. When the two
//! directions are separate named pipes, set [`FifoConfig::tx_path`]: a single
//! named pipe would hand our own outbound bytes back to the reader.
//!
//! Nodes are opened read-write and non-blocking, so opening a pipe never waits
//! for the other side. Every read waits in `poll(2)` for at most the configured
//! timeout so the reader thread can notice shutdown.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::TransportError;
use crate::link::PanelLink;

/// Bytes pulled from the device per read call
const READ_CHUNK: usize = 64;

/// Longest partial line kept while waiting for a delimiter
pub const MAX_PENDING: usize = 256;

/// Settings for opening a [`FifoLink`]
#[derive(Debug, Clone)]
pub struct FifoConfig {
    /// Byte terminating one inbound line
    pub delimiter: u8,
    /// Upper bound on a single `read_line` call
    pub poll_timeout: Duration,
    /// Separate node for outbound bytes; `None` writes to the inbound node
    pub tx_path: Option<PathBuf>,
}

impl Default for FifoConfig {
    fn default() -> Self {
        Self {
            delimiter: b'\n',
            poll_timeout: Duration::from_millis(5),
            tx_path: None,
        }
    }
}

/// Line-oriented link over a FIFO device node
pub struct FifoLink {
    rx: File,
    /// `None` when outbound bytes go to `rx`
    tx: Option<File>,
    path: PathBuf,
    config: FifoConfig,
    /// Bytes received but not yet returned as a complete line
    pending: Vec<u8>,
}

fn open_node(path: &Path) -> Result<File, TransportError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })
}

fn is_named_pipe(file: &File) -> bool {
    file.metadata()
        .map(|m| m.file_type().is_fifo())
        .unwrap_or(false)
}

impl FifoLink {
    /// Open the device node(s) read-write
    ///
    /// # Arguments
    /// * `path` - Inbound device node, e.g. `/dev/mcu_fifo`
    /// * `config` - Delimiter, poll timeout and optional outbound node
    pub fn open(path: impl AsRef<Path>, config: FifoConfig) -> Result<Self, TransportError> {
        let path = path.as_ref().to_path_buf();
        let rx = open_node(&path)?;
        let tx = config.tx_path.as_deref().map(open_node).transpose()?;

        if tx.is_none() && is_named_pipe(&rx) {
            warn!(
                "{} is a named pipe without a separate outbound node; LED output will loop back",
                path.display()
            );
        }
        debug!("Opened FIFO {}", path.display());
        Ok(Self {
            rx,
            tx,
            path,
            config,
            pending: Vec::with_capacity(READ_CHUNK),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Split off the first complete line in `pending`, delimiter included
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self
            .pending
            .iter()
            .position(|&b| b == self.config.delimiter)?;
        let rest = self.pending.split_off(end + 1);
        Some(std::mem::replace(&mut self.pending, rest))
    }

    /// Wait until the device is readable or the poll timeout passes
    fn wait_readable(&self) -> Result<bool, TransportError> {
        let mut pfd = libc::pollfd {
            fd: self.rx.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = self.config.poll_timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
        // SAFETY: `pfd` is a valid pollfd for the lifetime of the call
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if ret < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(TransportError::Io(err));
        }
        Ok(ret > 0)
    }
}

impl PanelLink for FifoLink {
    fn read_line(&mut self) -> Result<Vec<u8>, TransportError> {
        if let Some(line) = self.take_line() {
            return Ok(line);
        }
        if !self.wait_readable()? {
            return Err(TransportError::EmptyBuffer);
        }

        let mut chunk = [0u8; READ_CHUNK];
        match self.rx.read(&mut chunk) {
            Ok(0) => {
                // No writer attached; poll reports HUP immediately, so pace the loop
                std::thread::sleep(self.config.poll_timeout);
                Err(TransportError::EmptyBuffer)
            }
            Ok(n) => {
                self.pending.extend_from_slice(&chunk[..n]);
                if let Some(line) = self.take_line() {
                    return Ok(line);
                }
                if self.pending.len() > MAX_PENDING {
                    warn!(
                        "Discarding {} bytes from {} without a line delimiter",
                        self.pending.len(),
                        self.path.display()
                    );
                    self.pending.clear();
                }
                Err(TransportError::EmptyBuffer)
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Err(TransportError::EmptyBuffer)
            }
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let out = self.tx.as_mut().unwrap_or(&mut self.rx);
        let written = match out.write(bytes) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => 0,
            Err(e) => return Err(TransportError::Io(e)),
        };
        if written != bytes.len() {
            return Err(TransportError::ShortWrite {
                expected: bytes.len(),
                written,
            });
        }
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.config.tx_path {
            Some(tx) => format!("FIFO {} / {}", self.path.display(), tx.display()),
            None => format!("FIFO {}", self.path.display()),
        }
    }
}
