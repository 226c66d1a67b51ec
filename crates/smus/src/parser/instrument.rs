//! `INS1` instrument definitions.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::latin1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentKind {
    /// Instrument file loaded by name
    Standard,
    Midi { channel: u8, preset: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub register: u8,
    pub kind: InstrumentKind,
    pub name: String,
}

impl Instrument {
    /// Decode an `INS1` payload: register, type, two data bytes, then the name.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < 4 {
            return None;
        }
        let (fixed, name) = payload.split_at(4);
        let kind = match fixed[1] {
            0 => InstrumentKind::Standard,
            _ => InstrumentKind::Midi {
                channel: fixed[2],
                preset: fixed[3],
            },
        };
        Some(Instrument {
            register: fixed[0],
            kind,
            name: latin1(name),
        })
    }
}

/// Instrument registers 0-255, as defined by the `INS1` chunks seen so far
#[derive(Debug, Clone)]
pub struct InstrumentTable {
    registers: Vec<Option<Instrument>>,
}

impl Default for InstrumentTable {
    fn default() -> Self {
        InstrumentTable {
            registers: vec![None; 256],
        }
    }
}

impl InstrumentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition, replacing any earlier one for the same register
    pub fn insert(&mut self, instrument: Instrument) {
        let register = usize::from(instrument.register);
        self.registers[register] = Some(instrument);
    }

    pub fn get(&self, register: u8) -> Option<&Instrument> {
        self.registers[usize::from(register)].as_ref()
    }

    /// Name of the instrument in `register`, empty when undefined
    pub fn name(&self, register: u8) -> &str {
        self.get(register).map(|i| i.name.as_str()).unwrap_or("")
    }

    /// Name to use in a track name. Unnamed registers fall back to `#N`,
    /// which keeps them apart from each other and from an instrument
    /// literally named "N".
    pub fn label(&self, register: u8) -> Cow<'_, str> {
        match self.name(register) {
            "" => Cow::Owned(format!("#{}", register)),
            name => Cow::Borrowed(name),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.registers.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
