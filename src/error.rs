//! Controller error type

use thiserror::Error;

use panel_transport::{DecodeError, TransportError};

use crate::config::ConfigError;

/// Errors surfaced by the controller layer
///
/// Only `Construction` and `Config` ever leave the crate; decode and I/O
/// faults are contained in the reader loop and logged.
#[derive(Error, Debug)]
pub enum ControllerError {
    /// Device or thread unavailable at startup
    #[error("Controller construction failed: {0}")]
    Construction(#[source] TransportError),

    #[error("Dropped malformed message: {0}")]
    Decode(#[from] DecodeError),

    #[error("Panel I/O error: {0}")]
    Io(#[source] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ControllerError {
    /// True when the reader loop should retry without logging
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(e) if e.is_transient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ControllerError::Io(TransportError::EmptyBuffer).is_transient());
        assert!(!ControllerError::Io(TransportError::Disconnected).is_transient());
        assert!(!ControllerError::Construction(TransportError::EmptyBuffer).is_transient());
        assert!(!ControllerError::from(DecodeError::Empty).is_transient());
    }

    #[test]
    fn test_decode_error_converts() {
        let err: ControllerError = DecodeError::UnknownOpcode(0x42).into();
        assert_eq!(err.to_string(), "Dropped malformed message: Unknown opcode 0x42");
    }
}
