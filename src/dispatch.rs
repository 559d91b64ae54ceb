//! Inbound event routing
//!
//! Decoded panel events go to exactly one place: keyboard-section keys become
//! MIDI notes while routing is on, everything else goes to the UI sink, the
//! input event log and any registered key handlers.
//!
//! A panic in a sink or handler is caught and logged; it never takes the
//! reader thread down with it.

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, warn};

use panel_transport::{decode_event, BufferWriter, Guarded, Key, PanelEvent};

use crate::controller::{InputEvent, KeyHandler, INPUT_LOG_CAPACITY};
use crate::error::ControllerError;
use crate::sinks::{ControllerContext, MidiEvent};

struct KeyHandlers {
    on_press: KeyHandler,
    on_release: Option<KeyHandler>,
}

pub struct Dispatcher {
    context: ControllerContext,
    delimiter: u8,
    send_midi: AtomicBool,
    pressed: Guarded<HashSet<Key>>,
    handlers: Guarded<HashMap<Key, KeyHandlers>>,
    input_log: BufferWriter<Vec<InputEvent>>,
    input_overflow: AtomicBool,
}

impl Dispatcher {
    pub fn new(
        context: ControllerContext,
        delimiter: u8,
        send_midi: bool,
        input_log: BufferWriter<Vec<InputEvent>>,
    ) -> Self {
        Self {
            context,
            delimiter,
            send_midi: AtomicBool::new(send_midi),
            pressed: Guarded::new(HashSet::new()),
            handlers: Guarded::new(HashMap::new()),
            input_log,
            input_overflow: AtomicBool::new(false),
        }
    }

    /// Decode one inbound line and dispatch it
    ///
    /// A line holding only the delimiter is skipped.
    pub fn handle_line(&self, line: &[u8]) -> Result<(), ControllerError> {
        if line.is_empty() || line == [self.delimiter] {
            return Ok(());
        }
        let event = decode_event(line)?;
        self.dispatch(event);
        Ok(())
    }

    pub fn dispatch(&self, event: PanelEvent) {
        match event {
            PanelEvent::KeyDown(key) => self.key_transition(key, true),
            PanelEvent::KeyUp(key) => self.key_transition(key, false),
            PanelEvent::Encoder(ev) => {
                isolate("UI encoder sink", || self.context.ui.encoder(ev));
                self.log_input(InputEvent::Encoder(ev));
            }
            PanelEvent::Led(cmd) => {
                warn!("Ignoring LED command received from panel: {:?}", cmd);
            }
        }
    }

    fn key_transition(&self, key: Key, down: bool) {
        if self.midi_routing() {
            if let Some(note) = key.midi_note() {
                let event = if down {
                    MidiEvent::note_on(note)
                } else {
                    MidiEvent::note_off(note)
                };
                debug!("{:?} -> {:?}", key, event);
                isolate("Audio sink", || self.context.audio.send_midi_event(event));
                return;
            }
        }

        self.pressed.apply(|pressed| {
            if down {
                pressed.insert(key);
            } else {
                pressed.remove(&key);
            }
        });

        if down {
            isolate("UI keypress sink", || self.context.ui.keypress(key));
            self.log_input(InputEvent::KeyPress(key));
        } else {
            isolate("UI keyrelease sink", || self.context.ui.keyrelease(key));
            self.log_input(InputEvent::KeyRelease(key));
        }

        // Clone out so a handler may register handlers without deadlocking
        let handler = self.handlers.apply(|handlers| {
            handlers.get(&key).and_then(|h| {
                if down {
                    Some(h.on_press.clone())
                } else {
                    h.on_release.clone()
                }
            })
        });
        if let Some(handler) = handler {
            isolate("Key handler", || handler(key));
        }
    }

    fn log_input(&self, event: InputEvent) {
        let stored = self.input_log.outer_locked(|log| {
            if log.len() >= INPUT_LOG_CAPACITY {
                return false;
            }
            log.push(event);
            true
        });
        if !stored && !self.input_overflow.swap(true, Ordering::Relaxed) {
            warn!(
                "Input event log full ({} events), dropping until drained",
                INPUT_LOG_CAPACITY
            );
        }
    }

    /// Re-arm the overflow warning after the log was drained
    pub fn input_log_drained(&self) {
        self.input_overflow.store(false, Ordering::Relaxed);
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed.apply(|pressed| pressed.contains(&key))
    }

    pub fn register_key_handler(
        &self,
        key: Key,
        on_press: KeyHandler,
        on_release: Option<KeyHandler>,
    ) {
        self.handlers.apply(|handlers| {
            handlers.insert(
                key,
                KeyHandlers {
                    on_press,
                    on_release,
                },
            );
        });
    }

    pub fn set_midi_routing(&self, enabled: bool) {
        self.send_midi.store(enabled, Ordering::Relaxed);
    }

    pub fn midi_routing(&self) -> bool {
        self.send_midi.load(Ordering::Relaxed)
    }
}

/// Run a callback supplied from outside the crate, logging instead of unwinding
fn isolate(what: &str, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        let msg = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown panic");
        error!("{} panicked: {}", what, msg);
    }
}
