//! Standard MIDI File output.
//!
//! Writes format 1 (one SMF track per emitted track) through `midly`.

use std::path::{Path, PathBuf};

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::emitter::EmittedTrack;
use crate::error::{Error, Result};
use crate::parser::header::TICKS_PER_QUARTER;
use crate::track::TrackMessage;

/// Channel reserved for percussion in General MIDI
const PERCUSSION_CHANNEL: u8 = 9;

/// Largest delta a variable-length quantity can hold
const MAX_DELTA: u32 = 0x0FFF_FFFF;

/// MIDI generation parameters
#[derive(Debug, Clone)]
pub struct MidiParams {
    pub ticks_per_quarter: u16,
    /// Give each track its own channel instead of putting everything on 0
    pub channel_per_track: bool,
}

impl Default for MidiParams {
    fn default() -> Self {
        Self {
            ticks_per_quarter: TICKS_PER_QUARTER,
            channel_per_track: false,
        }
    }
}

/// Serialize emitted tracks to SMF bytes.
pub fn to_smf(tracks: &[EmittedTrack], params: &MidiParams) -> Result<Vec<u8>> {
    // Text payloads are borrowed by the SMF events, so encode them first
    let texts: Vec<Vec<Vec<u8>>> = tracks
        .iter()
        .map(|track| {
            track
                .events
                .iter()
                .map(|(_, message)| match message {
                    TrackMessage::Copyright(text) | TrackMessage::TrackName(text) => {
                        encode_latin1(text)
                    }
                    _ => Vec::new(),
                })
                .collect()
        })
        .collect();

    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::from(params.ticks_per_quarter.min(0x7FFF))),
    ));

    for (index, (track, texts)) in tracks.iter().zip(&texts).enumerate() {
        let channel = if params.channel_per_track {
            channel_for(index)
        } else {
            0
        };
        let events = track
            .events
            .iter()
            .zip(texts)
            .map(|((delta, message), text)| {
                if *delta > MAX_DELTA {
                    return Err(Error::MidiWrite(format!(
                        "delta of {} ticks in track {:?} does not fit in a MIDI file",
                        delta, track.name
                    )));
                }
                Ok(TrackEvent {
                    delta: u28::from(*delta),
                    kind: event_kind(message, text, u4::from(channel)),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        smf.tracks.push(events);
    }

    let mut buffer = Vec::new();
    smf.write(&mut buffer)
        .map_err(|e| Error::MidiWrite(e.to_string()))?;
    Ok(buffer)
}

fn event_kind<'a>(message: &TrackMessage, text: &'a [u8], channel: u4) -> TrackEventKind<'a> {
    let midi = |message: MidiMessage| -> TrackEventKind<'a> {
        TrackEventKind::Midi { channel, message }
    };
    match *message {
        TrackMessage::Copyright(_) => TrackEventKind::Meta(MetaMessage::Copyright(text)),
        TrackMessage::TrackName(_) => TrackEventKind::Meta(MetaMessage::TrackName(text)),
        TrackMessage::Tempo(micros) => {
            TrackEventKind::Meta(MetaMessage::Tempo(u24::from(micros.min(0xFF_FFFF))))
        }
        TrackMessage::ProgramChange(program) => midi(MidiMessage::ProgramChange {
            program: u7::from(program & 0x7F),
        }),
        TrackMessage::NoteOn { key, velocity } => midi(MidiMessage::NoteOn {
            key: u7::from(key & 0x7F),
            vel: u7::from(velocity & 0x7F),
        }),
        // Note-on with zero velocity, as SMUS players expect
        TrackMessage::NoteOff { key } => midi(MidiMessage::NoteOn {
            key: u7::from(key & 0x7F),
            vel: u7::from(0),
        }),
        TrackMessage::EndOfTrack => TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

/// Channel for the `index`th track: 0.. skipping percussion, capped at 15
fn channel_for(index: usize) -> u8 {
    let channel = if index >= PERCUSSION_CHANNEL as usize {
        index + 1
    } else {
        index
    };
    channel.min(15) as u8
}

/// Text is Latin-1 on the SMUS side; keep it byte-for-byte.
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Output path for `input`: its extension replaced (or added) with `extension`.
pub fn destination_path(input: &Path, extension: &str) -> PathBuf {
    input.with_extension(extension.trim_start_matches('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(name: &str, events: Vec<(u32, TrackMessage)>) -> EmittedTrack {
        EmittedTrack {
            name: name.to_string(),
            events,
        }
    }

    fn single_note() -> EmittedTrack {
        track(
            "Song/1",
            vec![
                (0, TrackMessage::TrackName("Song/1".to_string())),
                (0, TrackMessage::Tempo(500_000)),
                (0, TrackMessage::ProgramChange(3)),
                (0, TrackMessage::NoteOn { key: 60, velocity: 64 }),
                (437, TrackMessage::NoteOff { key: 60 }),
                (0, TrackMessage::EndOfTrack),
            ],
        )
    }

    #[test]
    fn test_header() {
        let bytes = to_smf(&[single_note()], &MidiParams::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.format, Format::Parallel);
        assert_eq!(smf.header.timing, Timing::Metrical(u15::from(500)));
        assert_eq!(smf.tracks.len(), 1);
    }

    #[test]
    fn test_events_are_written_in_order() {
        let bytes = to_smf(&[single_note()], &MidiParams::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        let events = &smf.tracks[0];

        assert_eq!(events.len(), 6);
        assert_eq!(
            events[0].kind,
            TrackEventKind::Meta(MetaMessage::TrackName(b"Song/1"))
        );
        assert_eq!(
            events[1].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(u24::from(500_000)))
        );
        assert_eq!(
            events[2].kind,
            TrackEventKind::Midi {
                channel: u4::from(0),
                message: MidiMessage::ProgramChange {
                    program: u7::from(3)
                },
            }
        );
        assert_eq!(events[4].delta, u28::from(437));
        assert_eq!(
            events[4].kind,
            TrackEventKind::Midi {
                channel: u4::from(0),
                message: MidiMessage::NoteOn {
                    key: u7::from(60),
                    vel: u7::from(0)
                },
            }
        );
        assert_eq!(events[5].kind, TrackEventKind::Meta(MetaMessage::EndOfTrack));
    }

    #[test]
    fn test_latin1_text_is_preserved() {
        let tracks = [track(
            "Caf\u{e9}/1",
            vec![
                (0, TrackMessage::Copyright("\u{a9} 1987".to_string())),
                (0, TrackMessage::TrackName("Caf\u{e9}/1".to_string())),
                (0, TrackMessage::EndOfTrack),
            ],
        )];
        let bytes = to_smf(&tracks, &MidiParams::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(
            smf.tracks[0][0].kind,
            TrackEventKind::Meta(MetaMessage::Copyright(b"\xa9 1987"))
        );
        assert_eq!(
            smf.tracks[0][1].kind,
            TrackEventKind::Meta(MetaMessage::TrackName(b"Caf\xe9/1"))
        );
    }

    #[test]
    fn test_tempo_is_clamped() {
        let tracks = [track(
            "Slow/1",
            vec![
                (0, TrackMessage::Tempo(60_000_000)),
                (0, TrackMessage::EndOfTrack),
            ],
        )];
        let bytes = to_smf(&tracks, &MidiParams::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(
            smf.tracks[0][0].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(u24::from(0xFF_FFFF)))
        );
    }

    #[test]
    fn test_oversized_delta_is_an_error() {
        let tracks = [track(
            "Long/1",
            vec![
                (1 << 28, TrackMessage::NoteOn { key: 60, velocity: 64 }),
                (0, TrackMessage::EndOfTrack),
            ],
        )];
        let err = to_smf(&tracks, &MidiParams::default()).unwrap_err();
        assert!(matches!(err, Error::MidiWrite(_)));
        assert!(err.to_string().contains("268435456"));

        let fits = [track(
            "Long/1",
            vec![
                (MAX_DELTA, TrackMessage::NoteOn { key: 60, velocity: 64 }),
                (0, TrackMessage::EndOfTrack),
            ],
        )];
        let bytes = to_smf(&fits, &MidiParams::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks[0][0].delta.as_int(), MAX_DELTA);
    }

    #[test]
    fn test_channel_per_track_skips_percussion() {
        assert_eq!(channel_for(0), 0);
        assert_eq!(channel_for(8), 8);
        assert_eq!(channel_for(9), 10);
        assert_eq!(channel_for(14), 15);
        assert_eq!(channel_for(40), 15);

        let tracks: Vec<_> = (0..11)
            .map(|i| {
                track(
                    &format!("Song/{}", i + 1),
                    vec![
                        (0, TrackMessage::NoteOn { key: 60, velocity: 64 }),
                        (0, TrackMessage::EndOfTrack),
                    ],
                )
            })
            .collect();
        let params = MidiParams {
            channel_per_track: true,
            ..MidiParams::default()
        };
        let bytes = to_smf(&tracks, &params).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        let channels: Vec<u8> = smf
            .tracks
            .iter()
            .map(|t| match t[0].kind {
                TrackEventKind::Midi { channel, .. } => channel.as_int(),
                _ => panic!("expected a note"),
            })
            .collect();
        assert_eq!(channels, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11]);
    }

    #[test]
    fn test_destination_path() {
        assert_eq!(
            destination_path(Path::new("songs/Tune.smus"), "mid"),
            PathBuf::from("songs/Tune.mid")
        );
        assert_eq!(
            destination_path(Path::new("Tune"), ".midi"),
            PathBuf::from("Tune.midi")
        );
    }
}
