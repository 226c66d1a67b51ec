//! IFF chunk walking.
//!
//! A chunk is a 4-byte tag, a 4-byte big-endian length and the payload.
//! Lengths here always include the 8 header bytes, and chunks are padded so
//! the next one starts on an even offset.

use std::fmt;
use std::slice::ChunksExact;

use thiserror::Error;

/// Four-character chunk tag
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId(pub [u8; 4]);

impl ChunkId {
    pub const FORM: ChunkId = ChunkId(*b"FORM");
    pub const SMUS: ChunkId = ChunkId(*b"SMUS");
    pub const SHDR: ChunkId = ChunkId(*b"SHDR");
    pub const TRAK: ChunkId = ChunkId(*b"TRAK");
    pub const INS1: ChunkId = ChunkId(*b"INS1");
    pub const NAME: ChunkId = ChunkId(*b"NAME");

    /// Read a tag at `offset`, if four bytes are available
    pub fn at(buf: &[u8], offset: usize) -> Option<ChunkId> {
        let bytes = buf.get(offset..offset.checked_add(4)?)?;
        Some(ChunkId([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId({})", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("chunk header at offset {offset} needs 8 bytes, only {available} left")]
    TruncatedHeader { offset: usize, available: usize },

    #[error("chunk '{id}' at offset {offset} spans {length} bytes, past the end of the {buffer_len}-byte buffer")]
    Overrun {
        id: ChunkId,
        offset: usize,
        length: usize,
        buffer_len: usize,
    },
}

/// Span of one chunk inside a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub id: ChunkId,
    pub offset: usize,
    /// Whole chunk length, header included
    pub length: usize,
}

impl Chunk {
    pub const HEADER_LEN: usize = 8;

    pub fn payload_offset(&self) -> usize {
        self.offset + Self::HEADER_LEN
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Where the following chunk starts, pad byte included
    pub fn next_offset(&self) -> usize {
        let next = self.end();
        next + (next & 1)
    }

    pub fn payload<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.payload_offset()..self.end()]
    }

    /// Payload split into 2-byte words. A trailing odd byte is left in
    /// the iterator's remainder.
    pub fn event_words<'a>(&self, buf: &'a [u8]) -> ChunksExact<'a, u8> {
        self.payload(buf).chunks_exact(2)
    }
}

/// Read the declared length of the chunk whose length field starts at
/// `offset`, with the 8 header bytes added.
pub fn read_length(buf: &[u8], offset: usize) -> Option<usize> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    (raw as usize).checked_add(Chunk::HEADER_LEN)
}

/// Read the chunk header at `offset` and check that the whole chunk fits.
pub fn read_chunk(buf: &[u8], offset: usize) -> Result<Chunk, ChunkError> {
    let available = buf.len().saturating_sub(offset);
    let truncated = ChunkError::TruncatedHeader { offset, available };
    if available < Chunk::HEADER_LEN {
        return Err(truncated);
    }
    let id = ChunkId::at(buf, offset).ok_or(truncated.clone())?;
    let length = read_length(buf, offset + 4).ok_or(truncated)?;

    match offset.checked_add(length) {
        Some(end) if end <= buf.len() => Ok(Chunk { id, offset, length }),
        _ => Err(ChunkError::Overrun {
            id,
            offset,
            length,
            buffer_len: buf.len(),
        }),
    }
}

/// Iterator over consecutive chunks between `offset` and `end`.
///
/// Stops after the first error.
#[derive(Debug, Clone)]
pub struct ChunkWalker<'a> {
    buf: &'a [u8],
    offset: usize,
    end: usize,
}

impl<'a> ChunkWalker<'a> {
    pub fn new(buf: &'a [u8], offset: usize, end: usize) -> Self {
        ChunkWalker {
            buf,
            offset,
            end: end.min(buf.len()),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for ChunkWalker<'_> {
    type Item = Result<Chunk, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.end {
            return None;
        }
        match read_chunk(self.buf, self.offset) {
            Ok(chunk) => {
                self.offset = chunk.next_offset();
                Some(Ok(chunk))
            }
            Err(e) => {
                self.offset = self.end;
                Some(Err(e))
            }
        }
    }
}
