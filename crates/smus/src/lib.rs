//! SMUS (IFF Simple Musical Score) to Standard MIDI File conversion.
//!
//! A SMUS file is walked chunk by chunk; every `TRAK` part is decoded into
//! timed note events, ties are merged, and the result is routed onto output
//! tracks (one per part, or one per part and instrument) before being
//! serialized as SMF format 1.
//!
//! # Example
//!
//! ```no_run
//! use smus::{convert, to_smf, ConvertOptions, MidiParams, RoutingMode};
//!
//! let bytes = std::fs::read("Tune.smus").unwrap();
//! let options = ConvertOptions {
//!     routing: RoutingMode::Exploded,
//!     copyright: None,
//! };
//! let conversion = convert(&bytes, &options).unwrap();
//! for feedback in &conversion.feedback {
//!     eprintln!("{:?} at {}: {}", feedback.level, feedback.offset, feedback.message);
//! }
//! let midi = to_smf(&conversion.tracks, &MidiParams::default()).unwrap();
//! std::fs::write("Tune.mid", midi).unwrap();
//! ```

pub mod convert;
pub mod emitter;
pub mod error;
pub mod feedback;
pub mod midi;
pub mod parser;
pub mod router;
pub mod timeline;
pub mod track;

pub use convert::{convert, Conversion, ConvertOptions, TextChunk};
pub use emitter::EmittedTrack;
pub use error::{Error, Result};
pub use feedback::{Feedback, FeedbackLevel};
pub use midi::{destination_path, to_smf, MidiParams};
pub use parser::header::{ScoreHeader, TICKS_PER_QUARTER};
pub use parser::instrument::{Instrument, InstrumentKind, InstrumentTable};
pub use router::{RouteError, RoutingMode};
pub use track::TrackMessage;
