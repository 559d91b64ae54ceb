//! Fallback controller used when no panel is available

use std::sync::atomic::{AtomicBool, Ordering};

use panel_transport::{Key, KeyGroup, Led, LedColor};

use crate::controller::{Controller, InputEvent, KeyHandler};

/// Accepts every call and does nothing. No input ever arrives.
#[derive(Debug, Default)]
pub struct DummyController {
    send_midi: AtomicBool,
}

impl DummyController {
    pub fn new(send_midi: bool) -> Self {
        Self {
            send_midi: AtomicBool::new(send_midi),
        }
    }
}

impl Controller for DummyController {
    fn set_color(&self, _led: Led, _color: LedColor) {}

    fn flush_leds(&self) {}

    fn clear_leds(&self) {}

    fn clear_led_group(&self, _group: KeyGroup) {}

    fn is_pressed(&self, _key: Key) -> bool {
        false
    }

    fn register_key_handler(&self, _key: Key, _on_press: KeyHandler, _on_release: Option<KeyHandler>) {}

    fn set_midi_routing(&self, enabled: bool) {
        self.send_midi.store(enabled, Ordering::Relaxed);
    }

    fn midi_routing(&self) -> bool {
        self.send_midi.load(Ordering::Relaxed)
    }

    fn drain_input_events(&self, f: &mut dyn FnMut(&[InputEvent])) {
        f(&[]);
    }

    fn is_dummy(&self) -> bool {
        true
    }
}
