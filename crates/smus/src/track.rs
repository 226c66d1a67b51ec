//! Output tracks and the arena that owns them for one conversion.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Message placed on an output track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackMessage {
    Copyright(String),
    TrackName(String),
    /// Microseconds per quarter note
    Tempo(u32),
    ProgramChange(u8),
    NoteOn { key: u8, velocity: u8 },
    NoteOff { key: u8 },
    EndOfTrack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedMessage {
    pub time: u32,
    pub message: TrackMessage,
}

/// Index of a track inside its [`TrackArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(usize);

impl TrackId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A track under construction, with messages at absolute ticks
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTrack {
    pub name: String,
    /// 1-based number of the `TRAK` chunk this track came from
    pub part: u32,
    /// Instrument register, for exploded tracks only
    pub instrument: Option<u8>,
    pub program_initialized: bool,
    events: Vec<TimedMessage>,
}

impl OutputTrack {
    pub fn push(&mut self, time: u32, message: TrackMessage) {
        self.events.push(TimedMessage { time, message });
    }

    pub fn events(&self) -> &[TimedMessage] {
        &self.events
    }

    pub fn into_events(self) -> Vec<TimedMessage> {
        self.events
    }
}

/// Meta messages every new track starts with
#[derive(Debug, Clone, Default)]
pub struct TrackSeed {
    pub copyright: Option<String>,
    pub micros_per_quarter: u32,
}

/// Tracks of one conversion, deduplicated by name
#[derive(Debug, Default)]
pub struct TrackArena {
    seed: TrackSeed,
    tracks: Vec<OutputTrack>,
    by_name: HashMap<String, TrackId>,
}

impl TrackArena {
    pub fn new(seed: TrackSeed) -> Self {
        TrackArena {
            seed,
            tracks: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Return the track called `name`, creating and seeding it on first use.
    pub fn get_or_create(&mut self, name: &str, part: u32, instrument: Option<u8>) -> TrackId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }

        info!(track = name, "adding track");
        let mut track = OutputTrack {
            name: name.to_string(),
            part,
            instrument,
            program_initialized: false,
            events: Vec::new(),
        };
        if let Some(copyright) = self.seed.copyright.as_ref().filter(|c| !c.is_empty()) {
            track.push(0, TrackMessage::Copyright(copyright.clone()));
        }
        track.push(0, TrackMessage::TrackName(name.to_string()));
        track.push(0, TrackMessage::Tempo(self.seed.micros_per_quarter));

        let id = TrackId(self.tracks.len());
        self.tracks.push(track);
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn find(&self, name: &str) -> Option<TrackId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: TrackId) -> &OutputTrack {
        &self.tracks[id.0]
    }

    pub fn get_mut(&mut self, id: TrackId) -> &mut OutputTrack {
        &mut self.tracks[id.0]
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputTrack> {
        self.tracks.iter()
    }

    /// Tracks in creation order
    pub fn into_tracks(self) -> Vec<OutputTrack> {
        self.tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seed(copyright: Option<&str>) -> TrackSeed {
        TrackSeed {
            copyright: copyright.map(str::to_string),
            micros_per_quarter: 500_000,
        }
    }

    #[test]
    fn test_new_track_is_seeded() {
        let mut arena = TrackArena::new(seed(Some("(c) 1987")));
        let id = arena.get_or_create("Song/1", 1, None);
        let messages: Vec<_> = arena.get(id).events().iter().map(|e| &e.message).collect();
        assert_eq!(
            messages,
            vec![
                &TrackMessage::Copyright("(c) 1987".to_string()),
                &TrackMessage::TrackName("Song/1".to_string()),
                &TrackMessage::Tempo(500_000),
            ]
        );
    }

    #[test]
    fn test_empty_copyright_is_skipped() {
        let mut arena = TrackArena::new(seed(Some("")));
        let id = arena.get_or_create("Song/1", 1, None);
        assert_eq!(arena.get(id).events().len(), 2);
    }

    #[test]
    fn test_same_name_returns_same_track() {
        let mut arena = TrackArena::new(seed(None));
        let first = arena.get_or_create("Song/1/Piano", 1, Some(3));
        arena.get_mut(first).push(0, TrackMessage::NoteOn { key: 60, velocity: 64 });
        let before = arena.get(first).events().len();

        let second = arena.get_or_create("Song/1/Piano", 1, Some(4));
        assert_eq!(first, second);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.get(second).events().len(), before);
        assert_eq!(arena.get(second).instrument, Some(3));
    }

    #[test]
    fn test_find() {
        let mut arena = TrackArena::new(seed(None));
        let id = arena.get_or_create("Song/2", 2, None);
        assert_eq!(arena.find("Song/2"), Some(id));
        assert_eq!(arena.find("Song/3"), None);
    }
}
