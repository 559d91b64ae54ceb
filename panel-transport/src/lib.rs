//! Transport layer for the MCU front panel
//!
//! This crate holds everything that touches panel bytes or is shared with the
//! reader thread:
//!
//! - Protocol codec (opcodes, keys, encoders, LED commands)
//! - The `PanelLink` device seam with FIFO and in-memory backends
//! - `Guarded` and `DoubleBuffered` concurrency primitives

pub mod buffer;
pub mod error;
pub mod fifo;
pub mod guarded;
pub mod led;
pub mod link;
pub mod protocol;

pub use buffer::{AfterSwap, BufferWriter, Clear, DoubleBuffered, OuterGuard};
pub use error::{DecodeError, TransportError};
pub use fifo::{FifoConfig, FifoLink};
pub use guarded::Guarded;
pub use led::{Led, LedColor};
pub use link::{MemoryLink, MemoryPeer, PanelLink};
pub use protocol::{
    decode, decode_event, encode, step_delta, Encoder, EncoderEvent, Key, KeyGroup, LedCommand,
    Message, Opcode, PanelEvent,
};
