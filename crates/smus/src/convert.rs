//! Whole-file conversion: chunk dispatch, per-part decoding and routing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::emitter::{emit, EmittedTrack};
use crate::error::Result;
use crate::feedback::{Feedback, FeedbackCollector, FeedbackLevel};
use crate::parser::chunk::{Chunk, ChunkId, ChunkWalker};
use crate::parser::event::PartDecoder;
use crate::parser::header::ScoreHeader;
use crate::parser::instrument::{Instrument, InstrumentTable};
use crate::parser::{self, latin1};
use crate::router::{PartContext, RoutingMode, RoutingPolicy};
use crate::timeline;
use crate::track::{TrackArena, TrackSeed};

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub routing: RoutingMode,
    /// Copyright text placed at the start of every track
    pub copyright: Option<String>,
}

/// A chunk this converter does not interpret (`AUTH`, `ANNO`, `(c) `, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub id: String,
    pub text: String,
    pub offset: usize,
}

/// Result of converting one SMUS file
#[derive(Debug, Clone)]
pub struct Conversion {
    pub header: ScoreHeader,
    /// Last `NAME` seen, empty if none
    pub song_name: String,
    pub instruments: InstrumentTable,
    pub annotations: Vec<TextChunk>,
    /// Tracks in creation order
    pub tracks: Vec<EmittedTrack>,
    pub feedback: Vec<Feedback>,
}

impl Conversion {
    pub fn has_errors(&self) -> bool {
        self.feedback
            .iter()
            .any(|f| f.level == FeedbackLevel::Error)
    }
}

/// Convert an in-memory SMUS file into delta-timed tracks.
///
/// Structural problems (bad prologue, truncated chunk, unusable header)
/// fail the whole file. Anything recoverable ends up in
/// [`Conversion::feedback`].
pub fn convert(buf: &[u8], options: &ConvertOptions) -> Result<Conversion> {
    let mut feedback = FeedbackCollector::new();
    let layout = parser::open(buf, &mut feedback)?;
    let header = layout.header;
    info!(
        bpm = header.bpm(),
        parts = header.part_count,
        velocity = header.default_velocity,
        "score header"
    );

    let mut state = Converter {
        buf,
        header,
        router: options.routing.router(),
        arena: TrackArena::new(TrackSeed {
            copyright: options.copyright.clone(),
            micros_per_quarter: header.micros_per_quarter(),
        }),
        instruments: InstrumentTable::new(),
        song_name: String::new(),
        annotations: Vec::new(),
        parts: 0,
        feedback,
    };

    for chunk in ChunkWalker::new(buf, layout.body_start, layout.form_end) {
        let chunk = chunk?;
        state.feedback.set_offset(chunk.offset);
        debug!(id = %chunk.id, offset = chunk.offset, length = chunk.length, "chunk");
        state.dispatch(&chunk);
    }

    if state.parts != u32::from(header.part_count) {
        state.feedback.set_offset(0);
        state.feedback.info(format!(
            "header announces {} parts, file has {}",
            header.part_count, state.parts
        ));
    }

    let tracks = state.arena.into_tracks().into_iter().map(emit).collect();
    Ok(Conversion {
        header,
        song_name: state.song_name,
        instruments: state.instruments,
        annotations: state.annotations,
        tracks,
        feedback: state.feedback.into_feedback(),
    })
}

/// Mutable state of one conversion
struct Converter<'a> {
    buf: &'a [u8],
    header: ScoreHeader,
    router: Box<dyn RoutingPolicy>,
    arena: TrackArena,
    instruments: InstrumentTable,
    song_name: String,
    annotations: Vec<TextChunk>,
    parts: u32,
    feedback: FeedbackCollector,
}

impl Converter<'_> {
    fn dispatch(&mut self, chunk: &Chunk) {
        let payload = chunk.payload(self.buf);
        match chunk.id {
            ChunkId::TRAK => self.part(chunk),
            ChunkId::INS1 => match Instrument::parse(payload) {
                Some(instrument) => {
                    info!(
                        register = instrument.register,
                        name = %instrument.name,
                        "instrument"
                    );
                    self.instruments.insert(instrument);
                }
                None => self.feedback.warning("INS1 chunk too short, skipped"),
            },
            ChunkId::NAME => {
                self.song_name = latin1(payload);
                info!(name = %self.song_name, "song name");
            }
            _ => {
                let text = latin1(payload);
                info!(id = %chunk.id, %text, "text chunk");
                self.annotations.push(TextChunk {
                    id: chunk.id.to_string(),
                    text,
                    offset: chunk.offset,
                });
            }
        }
    }

    fn part(&mut self, chunk: &Chunk) {
        self.parts += 1;
        let ctx = PartContext {
            song_name: &self.song_name,
            part: self.parts,
            instruments: &self.instruments,
        };
        self.router.begin_part(&ctx, &mut self.arena);

        let instructions = PartDecoder::decode_part(
            chunk.event_words(self.buf),
            chunk.payload_offset(),
            self.header.delta_unit(),
            self.header.default_velocity,
            &mut self.feedback,
        );
        let events = timeline::assemble(instructions, &mut self.feedback);
        debug!(part = self.parts, events = events.len(), "part decoded");

        self.feedback.set_offset(chunk.offset);
        for event in &events {
            if let Err(e) = self.router.route(event, &ctx, &mut self.arena) {
                self.feedback.error(format!("{}, dropped", e));
            }
        }
    }
}
