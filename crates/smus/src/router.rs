//! Routing resolved part events onto output tracks.
//!
//! Two policies: one track per part ([`MergedRouter`]) or one track per
//! (part, instrument) pair ([`ExplodedRouter`]). The policy is picked once
//! per run through [`RoutingMode`].

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::instrument::InstrumentTable;
use crate::timeline::{ResolvedEvent, ResolvedKind};
use crate::track::{TrackArena, TrackId, TrackMessage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("part {part} plays a note at tick {time} before selecting an instrument")]
    NoInstrumentSelected { part: u32, time: u32 },
}

/// What a router needs to know about the part being routed
#[derive(Debug, Clone, Copy)]
pub struct PartContext<'a> {
    pub song_name: &'a str,
    /// 1-based part number
    pub part: u32,
    pub instruments: &'a InstrumentTable,
}

impl PartContext<'_> {
    /// `song/part`, or `song/part/instrument` for exploded tracks
    pub fn track_name(&self, instrument: Option<&str>) -> String {
        match instrument {
            Some(instrument) => format!("{}/{}/{}", self.song_name, self.part, instrument),
            None => format!("{}/{}", self.song_name, self.part),
        }
    }
}

pub trait RoutingPolicy {
    /// Called when a new part starts, before any of its events
    fn begin_part(&mut self, ctx: &PartContext<'_>, arena: &mut TrackArena);

    /// Place one event. Events arrive in time order.
    fn route(
        &mut self,
        event: &ResolvedEvent,
        ctx: &PartContext<'_>,
        arena: &mut TrackArena,
    ) -> Result<(), RouteError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingMode {
    /// One track per part
    #[default]
    Merged,
    /// One track per instrument used in each part
    Exploded,
}

impl RoutingMode {
    pub fn router(self) -> Box<dyn RoutingPolicy> {
        match self {
            RoutingMode::Merged => Box::new(MergedRouter::default()),
            RoutingMode::Exploded => Box::new(ExplodedRouter::default()),
        }
    }
}

/// Everything a part plays goes to that part's track, program changes
/// included.
#[derive(Debug, Default)]
pub struct MergedRouter {
    current: Option<TrackId>,
}

impl RoutingPolicy for MergedRouter {
    fn begin_part(&mut self, ctx: &PartContext<'_>, arena: &mut TrackArena) {
        let id = arena.get_or_create(&ctx.track_name(None), ctx.part, None);
        arena.get_mut(id).program_initialized = true;
        self.current = Some(id);
    }

    fn route(
        &mut self,
        event: &ResolvedEvent,
        ctx: &PartContext<'_>,
        arena: &mut TrackArena,
    ) -> Result<(), RouteError> {
        if self.current.is_none() {
            self.begin_part(ctx, arena);
        }
        let Some(id) = self.current else {
            return Ok(());
        };
        let message = match event.kind {
            ResolvedKind::ProgramChange(register) => TrackMessage::ProgramChange(register),
            ResolvedKind::NoteOn { pitch, velocity } => TrackMessage::NoteOn {
                key: pitch,
                velocity,
            },
            ResolvedKind::NoteOff { pitch } => TrackMessage::NoteOff { key: pitch },
        };
        arena.get_mut(id).push(event.time, message);
        Ok(())
    }
}

/// Each instrument selected in a part gets its own track. Program changes
/// switch the target track; the track's own program is emitted once.
#[derive(Debug, Default)]
pub struct ExplodedRouter {
    current: Option<TrackId>,
    /// Tracks holding each sounding pitch, oldest first. Releases of the
    /// same pitch on several instruments are paired in note-on order.
    sounding: HashMap<u8, VecDeque<TrackId>>,
}

impl ExplodedRouter {
    fn release_track(&mut self, pitch: u8) -> Option<TrackId> {
        let holders = self.sounding.get_mut(&pitch)?;
        let id = holders.pop_front();
        if holders.is_empty() {
            self.sounding.remove(&pitch);
        }
        id
    }
}

impl RoutingPolicy for ExplodedRouter {
    fn begin_part(&mut self, _ctx: &PartContext<'_>, _arena: &mut TrackArena) {
        self.current = None;
        self.sounding.clear();
    }

    fn route(
        &mut self,
        event: &ResolvedEvent,
        ctx: &PartContext<'_>,
        arena: &mut TrackArena,
    ) -> Result<(), RouteError> {
        let missing = RouteError::NoInstrumentSelected {
            part: ctx.part,
            time: event.time,
        };
        match event.kind {
            ResolvedKind::ProgramChange(register) => {
                let label = ctx.instruments.label(register);
                let name = ctx.track_name(Some(label.as_ref()));
                let id = arena.get_or_create(&name, ctx.part, Some(register));
                let track = arena.get_mut(id);
                if !track.program_initialized {
                    track.push(event.time, TrackMessage::ProgramChange(register));
                    track.program_initialized = true;
                }
                self.current = Some(id);
            }
            ResolvedKind::NoteOn { pitch, velocity } => {
                let id = self.current.ok_or(missing)?;
                arena.get_mut(id).push(
                    event.time,
                    TrackMessage::NoteOn {
                        key: pitch,
                        velocity,
                    },
                );
                self.sounding.entry(pitch).or_default().push_back(id);
            }
            ResolvedKind::NoteOff { pitch } => {
                let id = self
                    .release_track(pitch)
                    .or(self.current)
                    .ok_or(missing)?;
                arena
                    .get_mut(id)
                    .push(event.time, TrackMessage::NoteOff { key: pitch });
            }
        }
        Ok(())
    }
}
