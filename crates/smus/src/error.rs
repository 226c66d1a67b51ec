use crate::parser::chunk::{ChunkError, ChunkId};
use crate::parser::header::HeaderError;

/// Errors that make a whole file unconvertible.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("file is only {len} bytes, too short for a SMUS header")]
    TooShort { len: usize },

    #[error("expected '{expected}' at offset {offset}, found '{found}'")]
    MissingTag {
        expected: ChunkId,
        found: ChunkId,
        offset: usize,
    },

    #[error("malformed chunk: {0}")]
    Chunk(#[from] ChunkError),

    #[error("malformed score header: {0}")]
    Header(#[from] HeaderError),

    #[error("MIDI write error: {0}")]
    MidiWrite(String),
}

pub type Result<T> = std::result::Result<T, Error>;
