//! Controller capability set
//!
//! Both the live runtime and the no-op fallback implement [`Controller`], so
//! callers never need to know whether a physical panel is attached.

use std::sync::Arc;

use panel_transport::{EncoderEvent, Key, KeyGroup, Led, LedColor};

/// Callback fired for a key transition; runs on the reader thread
pub type KeyHandler = Arc<dyn Fn(Key) + Send + Sync>;

/// UI-routed input, as kept in the input event log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyPress(Key),
    KeyRelease(Key),
    Encoder(EncoderEvent),
}

/// Pending input events kept before new ones are dropped
pub const INPUT_LOG_CAPACITY: usize = 1024;

pub trait Controller: Send + Sync {
    /// Queue a color update for one LED; sent on the next transmission
    fn set_color(&self, led: Led, color: LedColor);

    /// Request transmission of everything queued so far
    fn flush_leds(&self);

    /// Queue a command turning every LED off
    fn clear_leds(&self);

    /// Queue a command turning off the LEDs of one key group
    fn clear_led_group(&self, group: KeyGroup);

    /// Whether `key` is currently held. Keys routed to MIDI are not tracked.
    fn is_pressed(&self, key: Key) -> bool;

    /// Install callbacks for `key`, replacing any previous ones
    fn register_key_handler(&self, key: Key, on_press: KeyHandler, on_release: Option<KeyHandler>);

    fn set_midi_routing(&self, enabled: bool);

    fn midi_routing(&self) -> bool;

    /// Hand every input event logged since the previous call to `f`
    ///
    /// Only one caller may drain at a time; concurrent calls serialize.
    fn drain_input_events(&self, f: &mut dyn FnMut(&[InputEvent]));

    /// True for the fallback used when no panel is available
    fn is_dummy(&self) -> bool {
        false
    }
}
