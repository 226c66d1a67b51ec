//! `SHDR` score header.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time division written to the MIDI file, in ticks per quarter note.
pub const TICKS_PER_QUARTER: u16 = 500;

/// Real-time length of a quarter note that `delta_unit` is normalized to.
const QUARTER_NOTE_MICROS: u64 = 500_000;

/// Tempo the normalization is expressed against (120 bpm).
const REFERENCE_TEMPO_MICROS: u64 = 500_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("SHDR payload is {len} bytes, expected at least {}", ScoreHeader::LEN)]
    Truncated { len: usize },

    #[error("SHDR tempo field {raw:#06x} gives a tempo of zero")]
    ZeroTempo { raw: u16 },
}

/// Global score parameters, fixed for the whole file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreHeader {
    /// Tempo in 128ths of a quarter note per minute
    pub tempo_raw: u16,
    /// Velocity each part starts with
    pub default_velocity: u8,
    /// Number of `TRAK` chunks the score declares
    pub part_count: u8,
}

impl ScoreHeader {
    pub const LEN: usize = 4;

    pub fn parse(payload: &[u8]) -> Result<Self, HeaderError> {
        if payload.len() < Self::LEN {
            return Err(HeaderError::Truncated { len: payload.len() });
        }
        let header = ScoreHeader {
            tempo_raw: u16::from_be_bytes([payload[0], payload[1]]),
            default_velocity: payload[2],
            part_count: payload[3],
        };
        if header.bpm() == 0 {
            return Err(HeaderError::ZeroTempo {
                raw: header.tempo_raw,
            });
        }
        Ok(header)
    }

    /// Quarter notes per minute
    pub fn bpm(&self) -> u16 {
        self.tempo_raw >> 7
    }

    /// Value of the MIDI tempo meta event
    pub fn micros_per_quarter(&self) -> u32 {
        500_000 * 120 / u32::from(self.bpm().max(1))
    }

    /// Ticks per quarter note used when converting note durations.
    ///
    /// Independent of the score tempo: tempo is carried by the meta event.
    pub fn delta_unit(&self) -> u32 {
        (QUARTER_NOTE_MICROS * u64::from(TICKS_PER_QUARTER) / REFERENCE_TEMPO_MICROS) as u32
    }
}
