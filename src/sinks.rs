//! Collaborator interfaces the controller reports to
//!
//! The audio engine and UI live outside this crate. The controller receives
//! handles to them at construction through [`ControllerContext`]; there is no
//! process-wide lookup.

use std::sync::Arc;

use tracing::info;

use panel_transport::{EncoderEvent, Guarded, Key};

/// Velocity used for synthesized note-on messages
pub const NOTE_ON_VELOCITY: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteOnEvent {
    pub note: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteOffEvent {
    pub note: u8,
}

/// MIDI event synthesized from a keyboard-section key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn(NoteOnEvent),
    NoteOff(NoteOffEvent),
}

impl MidiEvent {
    pub fn note_on(note: u8) -> Self {
        Self::NoteOn(NoteOnEvent { note })
    }

    pub fn note_off(note: u8) -> Self {
        Self::NoteOff(NoteOffEvent { note })
    }

    pub fn note(&self) -> u8 {
        match self {
            Self::NoteOn(e) => e.note,
            Self::NoteOff(e) => e.note,
        }
    }

    /// Channel-0 MIDI bytes
    pub fn to_bytes(&self) -> [u8; 3] {
        match self {
            Self::NoteOn(e) => [0x90, e.note, NOTE_ON_VELOCITY],
            Self::NoteOff(e) => [0x80, e.note, 0],
        }
    }
}

impl From<NoteOnEvent> for MidiEvent {
    fn from(e: NoteOnEvent) -> Self {
        Self::NoteOn(e)
    }
}

impl From<NoteOffEvent> for MidiEvent {
    fn from(e: NoteOffEvent) -> Self {
        Self::NoteOff(e)
    }
}

/// Audio engine input
pub trait AudioSink: Send + Sync {
    fn send_midi_event(&self, event: MidiEvent);
}

/// UI input. Called on the controller's reader thread.
pub trait UiSink: Send + Sync {
    fn keypress(&self, key: Key);
    fn keyrelease(&self, key: Key);
    fn encoder(&self, event: EncoderEvent);
}

/// Handles passed to a controller at construction
#[derive(Clone)]
pub struct ControllerContext {
    pub audio: Arc<dyn AudioSink>,
    pub ui: Arc<dyn UiSink>,
}

impl ControllerContext {
    pub fn new(audio: Arc<dyn AudioSink>, ui: Arc<dyn UiSink>) -> Self {
        Self { audio, ui }
    }

    /// Context whose sinks discard everything
    pub fn null() -> Self {
        Self::new(Arc::new(NullSink), Arc::new(NullSink))
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn send_midi_event(&self, _event: MidiEvent) {}
}

impl UiSink for NullSink {
    fn keypress(&self, _key: Key) {}
    fn keyrelease(&self, _key: Key) {}
    fn encoder(&self, _event: EncoderEvent) {}
}

/// Writes every event to the log; stands in for an engine and UI
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AudioSink for LogSink {
    fn send_midi_event(&self, event: MidiEvent) {
        match event {
            MidiEvent::NoteOn(e) => info!("Note on {}", e.note),
            MidiEvent::NoteOff(e) => info!("Note off {}", e.note),
        }
    }
}

impl UiSink for LogSink {
    fn keypress(&self, key: Key) {
        info!("Key press {:?}", key);
    }

    fn keyrelease(&self, key: Key) {
        info!("Key release {:?}", key);
    }

    fn encoder(&self, event: EncoderEvent) {
        info!("Encoder {:?} {:+}", event.encoder, event.steps);
    }
}

/// Event captured by [`RecordingSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Midi(MidiEvent),
    KeyPress(Key),
    KeyRelease(Key),
    Encoder(EncoderEvent),
}

/// Keeps every event it receives, in arrival order
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Guarded<Vec<Recorded>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.apply(|e| e.clone())
    }

    pub fn midi_events(&self) -> Vec<MidiEvent> {
        self.events.apply(|e| {
            e.iter()
                .filter_map(|r| match r {
                    Recorded::Midi(m) => Some(*m),
                    _ => None,
                })
                .collect()
        })
    }

    /// Every event except MIDI
    pub fn ui_events(&self) -> Vec<Recorded> {
        self.events.apply(|e| {
            e.iter()
                .filter(|r| !matches!(r, Recorded::Midi(_)))
                .copied()
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.events.apply(|e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, event: Recorded) {
        self.events.apply(|e| e.push(event));
    }
}

impl AudioSink for RecordingSink {
    fn send_midi_event(&self, event: MidiEvent) {
        self.push(Recorded::Midi(event));
    }
}

impl UiSink for RecordingSink {
    fn keypress(&self, key: Key) {
        self.push(Recorded::KeyPress(key));
    }

    fn keyrelease(&self, key: Key) {
        self.push(Recorded::KeyRelease(key));
    }

    fn encoder(&self, event: EncoderEvent) {
        self.push(Recorded::Encoder(event));
    }
}
