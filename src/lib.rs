//! Control-surface driver for the instrument front panel
//!
//! Turns lines read from the panel MCU's FIFO into MIDI notes and UI events,
//! and carries LED commands back. See `panel_transport` for the wire protocol
//! and buffering primitives.
//!
//! ```no_run
//! use panel_driver::{make_or_dummy, Controller, ControllerContext, PanelConfig};
//! use panel_driver::transport::{Key, Led, LedColor};
//!
//! let controller = make_or_dummy(&PanelConfig::default(), ControllerContext::null());
//! controller.set_color(Led::new(Key::Play), LedColor::GREEN);
//! controller.flush_leds();
//! ```

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod dummy;
pub mod error;
pub mod factory;
pub mod runtime;
pub mod sinks;
pub mod worker;

pub use panel_transport as transport;

pub use config::{ConfigError, PanelConfig};
pub use controller::{Controller, InputEvent, KeyHandler, INPUT_LOG_CAPACITY};
pub use dummy::DummyController;
pub use error::ControllerError;
pub use factory::make_or_dummy;
pub use runtime::McuFifoController;
pub use sinks::{
    AudioSink, ControllerContext, LogSink, MidiEvent, NoteOffEvent, NoteOnEvent, NullSink,
    Recorded, RecordingSink, UiSink,
};
