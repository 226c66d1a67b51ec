//! Absolute-time tracks to delta-time tracks.

use serde::{Deserialize, Serialize};

use crate::track::{OutputTrack, TrackMessage};

/// A finished track: `(delta ticks, message)` pairs ending with
/// end-of-track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedTrack {
    pub name: String,
    pub events: Vec<(u32, TrackMessage)>,
}

impl EmittedTrack {
    /// Absolute tick of every event, by summing the deltas
    pub fn absolute_times(&self) -> Vec<u32> {
        self.events
            .iter()
            .scan(0u32, |clock, (delta, _)| {
                *clock += delta;
                Some(*clock)
            })
            .collect()
    }
}

/// Convert one track. Its events must already be in time order.
pub fn emit(track: OutputTrack) -> EmittedTrack {
    let name = track.name.clone();
    let timed = track.into_events();
    let mut events = Vec::with_capacity(timed.len() + 1);
    let mut clock = 0u32;

    for event in timed {
        debug_assert!(event.time >= clock, "track events out of order");
        events.push((event.time.saturating_sub(clock), event.message));
        clock = clock.max(event.time);
    }
    events.push((0, TrackMessage::EndOfTrack));

    EmittedTrack { name, events }
}
