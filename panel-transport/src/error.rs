//! Transport and protocol error types

use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::Opcode;

/// Errors that can occur while talking to the panel link
#[derive(Error, Debug)]
pub enum TransportError {
    /// No complete line is pending. Expected while the panel is idle.
    #[error("No data available on FIFO")]
    EmptyBuffer,

    #[error("Couldn't open FIFO device '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("FIFO I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { expected: usize, written: usize },

    #[error("Device disconnected")]
    Disconnected,
}

impl TransportError {
    /// True for conditions the reader loop retries silently
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::EmptyBuffer)
    }
}

/// Errors from decoding an inbound panel message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Empty message")]
    Empty,

    #[error("Unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),

    #[error("{opcode} needs {expected} argument bytes, got {actual}")]
    MissingArguments {
        opcode: Opcode,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown key byte 0x{0:02X}")]
    UnknownKey(u8),

    #[error("Unknown LED group {0}")]
    UnknownLedGroup(u8),
}
