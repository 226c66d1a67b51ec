//! Per-part timeline assembly: time ordering and tie resolution.

use std::collections::{HashMap, VecDeque};

use crate::feedback::FeedbackCollector;
use crate::parser::event::{Instruction, InstructionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedKind {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8 },
    /// Instrument register
    ProgramChange(u8),
}

/// An event ready for routing, at an absolute tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEvent {
    pub time: u32,
    pub kind: ResolvedKind,
}

impl ResolvedEvent {
    fn new(time: u32, kind: ResolvedKind) -> Self {
        ResolvedEvent { time, kind }
    }
}

/// Sort one part's instructions by time and merge tied notes.
///
/// A tied note-off and the nearest later note-on of the same pitch at the
/// same tick both disappear, leaving one continuous note. A tie with no
/// such partner is released normally.
pub fn assemble(
    mut instructions: Vec<Instruction>,
    feedback: &mut FeedbackCollector,
) -> Vec<ResolvedEvent> {
    // Stable: events at the same tick keep their emission order
    instructions.sort_by_key(|i| i.time);

    // Pass 1: note-on positions by (tick, pitch), in order
    let mut note_ons: HashMap<(u32, u8), VecDeque<usize>> = HashMap::new();
    for (idx, instruction) in instructions.iter().enumerate() {
        if let InstructionKind::NoteOn { pitch, .. } = instruction.kind {
            note_ons
                .entry((instruction.time, pitch))
                .or_default()
                .push_back(idx);
        }
    }

    // Pass 2: emit, consuming tie partners
    let mut consumed = vec![false; instructions.len()];
    let mut resolved = Vec::with_capacity(instructions.len());

    for (idx, instruction) in instructions.iter().enumerate() {
        if consumed[idx] {
            continue;
        }
        let time = instruction.time;
        match instruction.kind {
            InstructionKind::NoteOn { pitch, velocity } => {
                resolved.push(ResolvedEvent::new(
                    time,
                    ResolvedKind::NoteOn { pitch, velocity },
                ));
            }
            InstructionKind::NoteOff { pitch, tied: false } => {
                resolved.push(ResolvedEvent::new(time, ResolvedKind::NoteOff { pitch }));
            }
            InstructionKind::NoteOff { pitch, tied: true } => {
                match take_partner(&mut note_ons, &consumed, (time, pitch), idx) {
                    Some(partner) => consumed[partner] = true,
                    None => {
                        feedback.warning(format!(
                            "no note to tie pitch {} into at tick {}, releasing it",
                            pitch, time
                        ));
                        resolved.push(ResolvedEvent::new(time, ResolvedKind::NoteOff { pitch }));
                    }
                }
            }
            InstructionKind::ProgramChange(register) => {
                resolved.push(ResolvedEvent::new(
                    time,
                    ResolvedKind::ProgramChange(register),
                ));
            }
        }
    }

    resolved
}

/// First unconsumed note-on for `key` positioned after `after`.
fn take_partner(
    note_ons: &mut HashMap<(u32, u8), VecDeque<usize>>,
    consumed: &[bool],
    key: (u32, u8),
    after: usize,
) -> Option<usize> {
    let queue = note_ons.get_mut(&key)?;
    while let Some(&candidate) = queue.front() {
        if candidate > after && !consumed[candidate] {
            queue.pop_front();
            return Some(candidate);
        }
        queue.pop_front();
    }
    None
}
