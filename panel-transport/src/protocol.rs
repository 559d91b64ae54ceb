//! Wire protocol for the MCU front panel
//!
//! Every message is one opcode byte followed by a fixed number of argument
//! bytes determined by the opcode. Inbound messages arrive one per line on the
//! FIFO; trailing bytes past the opcode's arity (the line delimiter, padding)
//! are ignored.
//!
//! ```text
//! KEY_DOWN        20 kk            kk = key byte
//! KEY_UP          21 kk
//! *_ENC_STEP      30..33 dd        dd = signed step count (two's complement)
//! CLEAR_ALL_LEDS  E0
//! CLEAR_LED_GROUP E1 gg            gg = key group (0-3)
//! SET_LED_COLOR   EC kk rr gg bb   kk = key byte of the LED
//! ```

use std::fmt;

use crate::error::DecodeError;
use crate::led::{Led, LedColor};

// ---------------------------------------------------------------------------
// Opcode
// ---------------------------------------------------------------------------

/// Protocol command byte. These values are a firmware contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    ClearAllLeds = 0xE0,
    ClearLedGroup = 0xE1,
    SetLedColor = 0xEC,
    KeyDown = 0x20,
    KeyUp = 0x21,
    BlueEncStep = 0x30,
    GreenEncStep = 0x31,
    YellowEncStep = 0x32,
    RedEncStep = 0x33,
}

impl Opcode {
    /// Every opcode, in table order
    pub const ALL: [Opcode; 9] = [
        Opcode::ClearAllLeds,
        Opcode::ClearLedGroup,
        Opcode::SetLedColor,
        Opcode::KeyDown,
        Opcode::KeyUp,
        Opcode::BlueEncStep,
        Opcode::GreenEncStep,
        Opcode::YellowEncStep,
        Opcode::RedEncStep,
    ];

    /// Wire byte
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Reverse lookup through [`Opcode::ALL`]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.byte() == byte)
    }

    /// Number of argument bytes following the opcode
    pub const fn arity(self) -> usize {
        match self {
            Opcode::ClearAllLeds => 0,
            Opcode::ClearLedGroup => 1,
            Opcode::SetLedColor => 4,
            Opcode::KeyDown | Opcode::KeyUp => 1,
            Opcode::BlueEncStep
            | Opcode::GreenEncStep
            | Opcode::YellowEncStep
            | Opcode::RedEncStep => 1,
        }
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Opcode::ClearAllLeds => "CLEAR_ALL_LEDS",
            Opcode::ClearLedGroup => "CLEAR_LED_GROUP",
            Opcode::SetLedColor => "SET_LED_COLOR",
            Opcode::KeyDown => "KEY_DOWN",
            Opcode::KeyUp => "KEY_UP",
            Opcode::BlueEncStep => "BLUE_ENC_STEP",
            Opcode::GreenEncStep => "GREEN_ENC_STEP",
            Opcode::YellowEncStep => "YELLOW_ENC_STEP",
            Opcode::RedEncStep => "RED_ENC_STEP",
        }
    }

    /// Encoder driven by this opcode, if it is a step event
    pub fn encoder(self) -> Option<Encoder> {
        match self {
            Opcode::BlueEncStep => Some(Encoder::Blue),
            Opcode::GreenEncStep => Some(Encoder::Green),
            Opcode::YellowEncStep => Some(Encoder::Yellow),
            Opcode::RedEncStep => Some(Encoder::Red),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const fn all_distinct(bytes: &[u8]) -> bool {
    let mut i = 0;
    while i < bytes.len() {
        let mut j = i + 1;
        while j < bytes.len() {
            if bytes[i] == bytes[j] {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const OPCODE_BYTES: [u8; Opcode::ALL.len()] = {
    let mut out = [0u8; Opcode::ALL.len()];
    let mut i = 0;
    while i < out.len() {
        out[i] = Opcode::ALL[i] as u8;
        i += 1;
    }
    out
};

const _: () = assert!(all_distinct(&OPCODE_BYTES), "opcode bytes must be distinct");

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Key group, stored in the top two bits of a key byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyGroup {
    /// Encoder push buttons
    EncoderClick = 0,
    /// Fixed-purpose function keys
    Function = 1,
    /// Channel keys C0..C9
    Channel = 2,
    /// Sequencer keys S0..S15
    Sequencer = 3,
}

impl KeyGroup {
    pub const ALL: [KeyGroup; 4] = [
        KeyGroup::EncoderClick,
        KeyGroup::Function,
        KeyGroup::Channel,
        KeyGroup::Sequencer,
    ];

    pub const fn byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|g| g.byte() == byte)
    }
}

const fn key_byte(group: KeyGroup, index: u8) -> u8 {
    ((group as u8) << 6) | index
}

/// Physical key on the panel. The discriminant is the wire byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Key {
    BlueClick = key_byte(KeyGroup::EncoderClick, 0),
    GreenClick = key_byte(KeyGroup::EncoderClick, 1),
    YellowClick = key_byte(KeyGroup::EncoderClick, 2),
    RedClick = key_byte(KeyGroup::EncoderClick, 3),

    Master = key_byte(KeyGroup::Function, 0),
    Plus = key_byte(KeyGroup::Function, 1),
    Minus = key_byte(KeyGroup::Function, 2),
    Sends = key_byte(KeyGroup::Function, 3),
    Routing = key_byte(KeyGroup::Function, 4),
    Rec = key_byte(KeyGroup::Function, 5),
    Fx1 = key_byte(KeyGroup::Function, 6),
    Fx2 = key_byte(KeyGroup::Function, 7),
    Play = key_byte(KeyGroup::Function, 8),
    Looper = key_byte(KeyGroup::Function, 9),
    Sequencer = key_byte(KeyGroup::Function, 10),
    Sampler = key_byte(KeyGroup::Function, 11),
    Settings = key_byte(KeyGroup::Function, 12),
    Arp = key_byte(KeyGroup::Function, 13),
    Synth = key_byte(KeyGroup::Function, 14),
    Envelope = key_byte(KeyGroup::Function, 15),
    External = key_byte(KeyGroup::Function, 16),
    Shift = key_byte(KeyGroup::Function, 17),
    Slots = key_byte(KeyGroup::Function, 18),
    Twist1 = key_byte(KeyGroup::Function, 19),
    Twist2 = key_byte(KeyGroup::Function, 20),

    C0 = key_byte(KeyGroup::Channel, 0),
    C1 = key_byte(KeyGroup::Channel, 1),
    C2 = key_byte(KeyGroup::Channel, 2),
    C3 = key_byte(KeyGroup::Channel, 3),
    C4 = key_byte(KeyGroup::Channel, 4),
    C5 = key_byte(KeyGroup::Channel, 5),
    C6 = key_byte(KeyGroup::Channel, 6),
    C7 = key_byte(KeyGroup::Channel, 7),
    C8 = key_byte(KeyGroup::Channel, 8),
    C9 = key_byte(KeyGroup::Channel, 9),

    S0 = key_byte(KeyGroup::Sequencer, 0),
    S1 = key_byte(KeyGroup::Sequencer, 1),
    S2 = key_byte(KeyGroup::Sequencer, 2),
    S3 = key_byte(KeyGroup::Sequencer, 3),
    S4 = key_byte(KeyGroup::Sequencer, 4),
    S5 = key_byte(KeyGroup::Sequencer, 5),
    S6 = key_byte(KeyGroup::Sequencer, 6),
    S7 = key_byte(KeyGroup::Sequencer, 7),
    S8 = key_byte(KeyGroup::Sequencer, 8),
    S9 = key_byte(KeyGroup::Sequencer, 9),
    S10 = key_byte(KeyGroup::Sequencer, 10),
    S11 = key_byte(KeyGroup::Sequencer, 11),
    S12 = key_byte(KeyGroup::Sequencer, 12),
    S13 = key_byte(KeyGroup::Sequencer, 13),
    S14 = key_byte(KeyGroup::Sequencer, 14),
    S15 = key_byte(KeyGroup::Sequencer, 15),
}

impl Key {
    /// Every key, in wire order
    pub const ALL: [Key; 51] = [
        Key::BlueClick,
        Key::GreenClick,
        Key::YellowClick,
        Key::RedClick,
        Key::Master,
        Key::Plus,
        Key::Minus,
        Key::Sends,
        Key::Routing,
        Key::Rec,
        Key::Fx1,
        Key::Fx2,
        Key::Play,
        Key::Looper,
        Key::Sequencer,
        Key::Sampler,
        Key::Settings,
        Key::Arp,
        Key::Synth,
        Key::Envelope,
        Key::External,
        Key::Shift,
        Key::Slots,
        Key::Twist1,
        Key::Twist2,
        Key::C0,
        Key::C1,
        Key::C2,
        Key::C3,
        Key::C4,
        Key::C5,
        Key::C6,
        Key::C7,
        Key::C8,
        Key::C9,
        Key::S0,
        Key::S1,
        Key::S2,
        Key::S3,
        Key::S4,
        Key::S5,
        Key::S6,
        Key::S7,
        Key::S8,
        Key::S9,
        Key::S10,
        Key::S11,
        Key::S12,
        Key::S13,
        Key::S14,
        Key::S15,
    ];

    /// Wire byte
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Reverse lookup through [`Key::ALL`]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.byte() == byte)
    }

    pub fn group(self) -> KeyGroup {
        match self.byte() >> 6 {
            0 => KeyGroup::EncoderClick,
            1 => KeyGroup::Function,
            2 => KeyGroup::Channel,
            _ => KeyGroup::Sequencer,
        }
    }

    /// Note number for keys on the piano-style keyboard section.
    ///
    /// Sequencer keys form the white keys and channel keys the black keys,
    /// starting at B2 (47).
    pub fn midi_note(self) -> Option<u8> {
        let note = match self {
            Key::S0 => 47,
            Key::S1 => 48,
            Key::C0 => 49,
            Key::S2 => 50,
            Key::C1 => 51,
            Key::S3 => 52,
            Key::S4 => 53,
            Key::C2 => 54,
            Key::S5 => 55,
            Key::C3 => 56,
            Key::S6 => 57,
            Key::C4 => 58,
            Key::S7 => 59,
            Key::S8 => 60,
            Key::C5 => 61,
            Key::S9 => 62,
            Key::C6 => 63,
            Key::S10 => 64,
            Key::S11 => 65,
            Key::C7 => 66,
            Key::S12 => 67,
            Key::C8 => 68,
            Key::S13 => 69,
            Key::C9 => 70,
            Key::S14 => 71,
            Key::S15 => 72,
            _ => return None,
        };
        Some(note)
    }
}

const KEY_BYTES: [u8; Key::ALL.len()] = {
    let mut out = [0u8; Key::ALL.len()];
    let mut i = 0;
    while i < out.len() {
        out[i] = Key::ALL[i] as u8;
        i += 1;
    }
    out
};

const _: () = assert!(all_distinct(&KEY_BYTES), "key bytes must be distinct");

// ---------------------------------------------------------------------------
// Encoders
// ---------------------------------------------------------------------------

/// Rotary encoder, named by knob color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoder {
    Blue,
    Green,
    Yellow,
    Red,
}

impl Encoder {
    pub const ALL: [Encoder; 4] = [Encoder::Blue, Encoder::Green, Encoder::Yellow, Encoder::Red];

    /// Opcode carrying step events for this encoder
    pub fn step_opcode(self) -> Opcode {
        match self {
            Encoder::Blue => Opcode::BlueEncStep,
            Encoder::Green => Opcode::GreenEncStep,
            Encoder::Yellow => Opcode::YellowEncStep,
            Encoder::Red => Opcode::RedEncStep,
        }
    }
}

/// Encoder turned by a number of steps. Negative is counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderEvent {
    pub encoder: Encoder,
    pub steps: i8,
}

impl EncoderEvent {
    pub fn new(encoder: Encoder, steps: i8) -> Self {
        Self { encoder, steps }
    }
}

/// Reinterpret a step byte as two's complement: 0..=127 as-is, 128..=255 as value - 256
pub fn step_delta(byte: u8) -> i8 {
    byte as i8
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// One protocol message: opcode plus exactly `opcode.arity()` argument bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub opcode: Opcode,
    pub args: Vec<u8>,
}

impl Message {
    pub fn new(opcode: Opcode, args: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            args: args.into(),
        }
    }

    /// Serialize to wire bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(self.opcode, &self.args)
    }

    /// Interpret the arguments as a typed event
    pub fn event(&self) -> Result<PanelEvent, DecodeError> {
        let arg = |i: usize| {
            self.args
                .get(i)
                .copied()
                .ok_or(DecodeError::MissingArguments {
                    opcode: self.opcode,
                    expected: self.opcode.arity(),
                    actual: self.args.len(),
                })
        };
        let key = |byte: u8| Key::from_byte(byte).ok_or(DecodeError::UnknownKey(byte));
        let step = |encoder: Encoder| -> Result<PanelEvent, DecodeError> {
            Ok(PanelEvent::Encoder(EncoderEvent::new(
                encoder,
                step_delta(arg(0)?),
            )))
        };

        let event = match self.opcode {
            Opcode::KeyDown => PanelEvent::KeyDown(key(arg(0)?)?),
            Opcode::KeyUp => PanelEvent::KeyUp(key(arg(0)?)?),
            Opcode::BlueEncStep => step(Encoder::Blue)?,
            Opcode::GreenEncStep => step(Encoder::Green)?,
            Opcode::YellowEncStep => step(Encoder::Yellow)?,
            Opcode::RedEncStep => step(Encoder::Red)?,
            Opcode::ClearAllLeds => PanelEvent::Led(LedCommand::ClearAll),
            Opcode::ClearLedGroup => {
                let byte = arg(0)?;
                let group = KeyGroup::from_byte(byte).ok_or(DecodeError::UnknownLedGroup(byte))?;
                PanelEvent::Led(LedCommand::ClearGroup(group))
            }
            Opcode::SetLedColor => PanelEvent::Led(LedCommand::SetColor {
                led: Led::new(key(arg(0)?)?),
                color: LedColor::new(arg(1)?, arg(2)?, arg(3)?),
            }),
        };
        Ok(event)
    }
}

/// Split raw bytes into opcode and arguments.
///
/// Fails on an empty input, an unknown opcode byte, or fewer argument bytes
/// than the opcode requires. Extra trailing bytes are ignored.
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    let (&first, rest) = bytes.split_first().ok_or(DecodeError::Empty)?;
    let opcode = Opcode::from_byte(first).ok_or(DecodeError::UnknownOpcode(first))?;
    let arity = opcode.arity();
    if rest.len() < arity {
        return Err(DecodeError::MissingArguments {
            opcode,
            expected: arity,
            actual: rest.len(),
        });
    }
    Ok(Message::new(opcode, &rest[..arity]))
}

/// Decode and interpret in one step
pub fn decode_event(bytes: &[u8]) -> Result<PanelEvent, DecodeError> {
    decode(bytes)?.event()
}

/// Build wire bytes for `opcode`. The caller supplies `opcode.arity()` arguments.
pub fn encode(opcode: Opcode, args: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + args.len());
    buf.push(opcode.byte());
    buf.extend_from_slice(args);
    buf
}

/// LED command, outbound in normal operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    ClearAll,
    ClearGroup(KeyGroup),
    SetColor { led: Led, color: LedColor },
}

impl LedCommand {
    pub fn to_message(self) -> Message {
        match self {
            LedCommand::ClearAll => Message::new(Opcode::ClearAllLeds, Vec::new()),
            LedCommand::ClearGroup(group) => Message::new(Opcode::ClearLedGroup, [group.byte()]),
            LedCommand::SetColor { led, color } => Message::new(
                Opcode::SetLedColor,
                [led.byte(), color.r, color.g, color.b],
            ),
        }
    }
}

/// Typed view of a decoded message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEvent {
    KeyDown(Key),
    KeyUp(Key),
    Encoder(EncoderEvent),
    Led(LedCommand),
}

impl PanelEvent {
    pub fn to_message(self) -> Message {
        match self {
            PanelEvent::KeyDown(key) => Message::new(Opcode::KeyDown, [key.byte()]),
            PanelEvent::KeyUp(key) => Message::new(Opcode::KeyUp, [key.byte()]),
            PanelEvent::Encoder(ev) => {
                Message::new(ev.encoder.step_opcode(), [ev.steps as u8])
            }
            PanelEvent::Led(cmd) => cmd.to_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_bytes_are_stable() {
        assert_eq!(Opcode::ClearAllLeds.byte(), 0xE0);
        assert_eq!(Opcode::ClearLedGroup.byte(), 0xE1);
        assert_eq!(Opcode::SetLedColor.byte(), 0xEC);
        assert_eq!(Opcode::KeyDown.byte(), 0x20);
        assert_eq!(Opcode::KeyUp.byte(), 0x21);
        assert_eq!(Opcode::BlueEncStep.byte(), 0x30);
        assert_eq!(Opcode::GreenEncStep.byte(), 0x31);
        assert_eq!(Opcode::YellowEncStep.byte(), 0x32);
        assert_eq!(Opcode::RedEncStep.byte(), 0x33);
    }

    #[test]
    fn test_opcode_reverse_lookup() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_byte(op.byte()), Some(op));
        }
        assert_eq!(Opcode::from_byte(0x00), None);
        assert_eq!(Opcode::from_byte(0xFF), None);
    }

    #[test]
    fn test_key_reverse_lookup() {
        for key in Key::ALL {
            assert_eq!(Key::from_byte(key.byte()), Some(key));
        }
        let known = (0..=u8::MAX).filter(|b| Key::from_byte(*b).is_some()).count();
        assert_eq!(known, Key::ALL.len());
    }

    #[test]
    fn test_key_groups() {
        assert_eq!(Key::RedClick.group(), KeyGroup::EncoderClick);
        assert_eq!(Key::Shift.group(), KeyGroup::Function);
        assert_eq!(Key::C9.group(), KeyGroup::Channel);
        assert_eq!(Key::S15.group(), KeyGroup::Sequencer);
        assert_eq!(Key::S0.byte(), 0xC0);
        assert_eq!(Key::C0.byte(), 0x80);
    }

    #[test]
    fn test_midi_table() {
        let mapped: Vec<u8> = Key::ALL.iter().filter_map(|k| k.midi_note()).collect();
        assert_eq!(mapped.len(), 26);
        let mut sorted = mapped.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (47..=72).collect::<Vec<u8>>());

        assert_eq!(Key::S0.midi_note(), Some(47));
        assert_eq!(Key::C0.midi_note(), Some(49));
        assert_eq!(Key::S15.midi_note(), Some(72));
        assert_eq!(Key::Shift.midi_note(), None);
        assert_eq!(Key::BlueClick.midi_note(), None);
    }

    #[test]
    fn test_roundtrip_every_opcode() {
        let samples: [&[u8]; 3] = [&[0x00, 0x00, 0x00, 0x00], &[0x7F, 0x80, 0x01, 0xFE], &[0xFF; 4]];
        for op in Opcode::ALL {
            for sample in samples {
                let args = &sample[..op.arity()];
                let msg = decode(&encode(op, args)).unwrap();
                assert_eq!(msg.opcode, op);
                assert_eq!(msg.args, args);
            }
        }
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(decode(&[0x10, 0xC0]), Err(DecodeError::UnknownOpcode(0x10)));
        assert_eq!(decode(&[]), Err(DecodeError::Empty));
    }

    #[test]
    fn test_missing_arguments() {
        assert_eq!(
            decode(&[0x20]),
            Err(DecodeError::MissingArguments {
                opcode: Opcode::KeyDown,
                expected: 1,
                actual: 0,
            })
        );
        assert!(decode(&[0xEC, 0xC0, 0xFF]).is_err());
        assert!(decode(&[0xE0]).is_ok());
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let msg = decode(&[0x20, 0xC0, b'\n']).unwrap();
        assert_eq!(msg.args, vec![0xC0]);
    }

    #[test]
    fn test_step_delta_sign() {
        for b in 0u8..=127 {
            assert_eq!(i16::from(step_delta(b)), i16::from(b));
        }
        for b in 128u8..=255 {
            assert_eq!(i16::from(step_delta(b)), i16::from(b) - 256);
        }
    }

    #[test]
    fn test_decode_encoder_event() {
        let event = decode_event(&[0x33, 0xFE]).unwrap();
        assert_eq!(event, PanelEvent::Encoder(EncoderEvent::new(Encoder::Red, -2)));
        let event = decode_event(&[0x30, 0x05]).unwrap();
        assert_eq!(event, PanelEvent::Encoder(EncoderEvent::new(Encoder::Blue, 5)));
    }

    #[test]
    fn test_decode_key_events() {
        assert_eq!(decode_event(&[0x20, 0xC0]), Ok(PanelEvent::KeyDown(Key::S0)));
        assert_eq!(decode_event(&[0x21, 0x51]), Ok(PanelEvent::KeyUp(Key::Shift)));
        assert_eq!(decode_event(&[0x20, 0x3F]), Err(DecodeError::UnknownKey(0x3F)));
    }

    #[test]
    fn test_led_commands_roundtrip() {
        let commands = [
            LedCommand::ClearAll,
            LedCommand::ClearGroup(KeyGroup::Channel),
            LedCommand::SetColor {
                led: Led::new(Key::Play),
                color: LedColor::new(1, 2, 3),
            },
        ];
        for cmd in commands {
            let bytes = cmd.to_message().to_bytes();
            assert_eq!(decode_event(&bytes), Ok(PanelEvent::Led(cmd)));
        }
        assert_eq!(
            LedCommand::SetColor {
                led: Led::new(Key::S1),
                color: LedColor::RED,
            }
            .to_message()
            .to_bytes(),
            vec![0xEC, 0xC1, 0xFF, 0x00, 0x00]
        );
        assert_eq!(decode_event(&[0xE1, 0x04]), Err(DecodeError::UnknownLedGroup(4)));
    }

    #[test]
    fn test_panel_event_to_message() {
        let ev = PanelEvent::Encoder(EncoderEvent::new(Encoder::Green, -1));
        assert_eq!(ev.to_message().to_bytes(), vec![0x31, 0xFF]);
        assert_eq!(PanelEvent::KeyDown(Key::S0).to_message().to_bytes(), vec![0x20, 0xC0]);
    }
}
