//! SMUS score events (`SEvent`) and the per-part decoding state machine.
//!
//! Each event is two bytes: a type code and a code-dependent data byte.
//! Codes 0-127 are notes, 128 is a rest, and the codes above are control
//! events.

use std::slice::ChunksExact;

use tracing::debug;

use crate::feedback::FeedbackCollector;

/// Rest "pitch"
pub const REST: u8 = 128;
/// Select instrument register
pub const SID_INSTRUMENT: u8 = 129;
pub const SID_TIME_SIGNATURE: u8 = 130;
pub const SID_KEY_SIGNATURE: u8 = 131;
/// Dynamic mark, used as the note velocity
pub const SID_VOLUME: u8 = 132;
/// Select MIDI preset; handled exactly like [`SID_INSTRUMENT`]
pub const SID_PRESET: u8 = 134;

/// Share of a note's duration that actually sounds. The rest of the slot
/// is left silent before the next note.
pub const RELEASE_FACTOR: f64 = 0.875;

const CHORD_BIT: u8 = 0x80;
const TIE_OUT_BIT: u8 = 0x40;
const TUPLET_MASK: u8 = 0x30;
const DOT_BIT: u8 = 0x08;
const DIVISION_MASK: u8 = 0x07;

/// A decoded note or rest event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    /// MIDI pitch, or [`REST`]
    pub pitch: u8,
    /// The next event starts at the same time as this one
    pub chord: bool,
    /// Sound continues into the next note of the same pitch
    pub tie_out: bool,
    /// 0 for none, otherwise `n` squeezes `2n` notes into the time of `2n + 1`
    pub tuplet: u8,
    pub dotted: bool,
    /// 0 = whole note, 1 = half, 2 = quarter ... 7 = 128th
    pub division: u8,
}

impl NoteEvent {
    pub fn from_bytes(pitch: u8, data: u8) -> Self {
        NoteEvent {
            pitch,
            chord: data & CHORD_BIT != 0,
            tie_out: data & TIE_OUT_BIT != 0,
            tuplet: (data & TUPLET_MASK) >> 4,
            dotted: data & DOT_BIT != 0,
            division: data & DIVISION_MASK,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.pitch == REST
    }

    /// Nominal length in ticks, given the ticks in a quarter note
    pub fn duration(&self, delta_unit: u32) -> u32 {
        let scale = 2f64.powi(2 - i32::from(self.division));
        let dot = if self.dotted { 1.5 } else { 1.0 };
        let mut duration = (f64::from(delta_unit) * scale * dot) as u32;
        if self.tuplet > 0 {
            let n = f64::from(self.tuplet);
            duration = (f64::from(duration) * (2.0 * n) / (2.0 * n + 1.0)) as u32;
        }
        duration
    }

    /// Sounding length in ticks
    pub fn release(&self, delta_unit: u32) -> u32 {
        (f64::from(self.duration(delta_unit)) * RELEASE_FACTOR) as u32
    }

    /// How far the time cursor moves after this event
    pub fn advance(&self, delta_unit: u32) -> u32 {
        if self.chord {
            0
        } else {
            self.duration(delta_unit)
        }
    }
}

/// Control events that are recognized but have no MIDI counterpart here
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    TimeSignature,
    KeySignature,
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreEvent {
    Note(NoteEvent),
    /// Instrument register selected
    ProgramChange(u8),
    /// New velocity for the following notes
    VolumeChange(u8),
    Ignored(Ignored),
}

impl ScoreEvent {
    pub fn decode(id: u8, data: u8) -> Self {
        match id {
            0..=REST => ScoreEvent::Note(NoteEvent::from_bytes(id, data)),
            SID_INSTRUMENT | SID_PRESET => ScoreEvent::ProgramChange(data),
            SID_VOLUME => ScoreEvent::VolumeChange(data),
            SID_TIME_SIGNATURE => ScoreEvent::Ignored(Ignored::TimeSignature),
            SID_KEY_SIGNATURE => ScoreEvent::Ignored(Ignored::KeySignature),
            other => ScoreEvent::Ignored(Ignored::Unknown(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8, tied: bool },
    /// Instrument register, not yet resolved to a track
    ProgramChange(u8),
}

/// A decoded event at an absolute tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub time: u32,
    pub kind: InstructionKind,
}

/// Decoding state for one `TRAK` chunk.
///
/// Produces instructions in emission order; they are not time-sorted
/// because chord members and releases overlap.
#[derive(Debug)]
pub struct PartDecoder {
    delta_unit: u32,
    time: u32,
    velocity: u8,
    instrument: Option<u8>,
    instructions: Vec<Instruction>,
}

impl PartDecoder {
    pub fn new(delta_unit: u32, velocity: u8) -> Self {
        PartDecoder {
            delta_unit,
            time: 0,
            velocity,
            instrument: None,
            instructions: Vec::new(),
        }
    }

    /// Decode a whole part from its 2-byte event words (see
    /// [`Chunk::event_words`](super::chunk::Chunk::event_words)).
    /// `base_offset` is the payload's position in the file, used to anchor
    /// feedback.
    pub fn decode_part(
        words: ChunksExact<'_, u8>,
        base_offset: usize,
        delta_unit: u32,
        velocity: u8,
        feedback: &mut FeedbackCollector,
    ) -> Vec<Instruction> {
        let mut decoder = PartDecoder::new(delta_unit, velocity);
        let trailing = words.remainder().len();
        let mut offset = base_offset;

        for word in words {
            feedback.set_offset(offset);
            decoder.feed(word[0], word[1], feedback);
            offset += 2;
        }
        if trailing > 0 {
            feedback.set_offset(offset);
            feedback.warning("part ends with a dangling odd byte, ignored");
        }

        decoder.finish()
    }

    /// Apply one event and return what it decoded to
    pub fn feed(&mut self, id: u8, data: u8, feedback: &mut FeedbackCollector) -> ScoreEvent {
        let event = ScoreEvent::decode(id, data);
        match event {
            ScoreEvent::Note(note) => {
                if !note.is_rest() {
                    self.push(InstructionKind::NoteOn {
                        pitch: note.pitch,
                        velocity: self.velocity.clamp(1, 127),
                    });
                    self.instructions.push(Instruction {
                        time: self.time.saturating_add(note.release(self.delta_unit)),
                        kind: InstructionKind::NoteOff {
                            pitch: note.pitch,
                            tied: note.tie_out,
                        },
                    });
                }
                self.time = self.time.saturating_add(note.advance(self.delta_unit));
            }
            ScoreEvent::ProgramChange(register) => {
                debug!(register, time = self.time, "instrument change");
                self.instrument = Some(register);
                self.push(InstructionKind::ProgramChange(register));
            }
            ScoreEvent::VolumeChange(volume) => {
                self.velocity = volume;
            }
            ScoreEvent::Ignored(Ignored::Unknown(code)) => {
                feedback.warning(format!("private SEvent {} skipped", code));
            }
            ScoreEvent::Ignored(other) => {
                debug!(?other, "signature event ignored");
            }
        }
        event
    }

    fn push(&mut self, kind: InstructionKind) {
        self.instructions.push(Instruction {
            time: self.time,
            kind,
        });
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Most recently selected instrument register
    pub fn instrument(&self) -> Option<u8> {
        self.instrument
    }

    pub fn finish(self) -> Vec<Instruction> {
        self.instructions
    }
}
