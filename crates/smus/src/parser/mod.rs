//! SMUS container parsing.
//!
//! A SMUS file is an IFF `FORM` whose type is `SMUS`, with the `SHDR`
//! header chunk first and the variable chunks (`NAME`, `INS1`, `TRAK`,
//! text) following in any order.

pub mod chunk;
pub mod event;
pub mod header;
pub mod instrument;

use tracing::debug;

use crate::error::{Error, Result};
use crate::feedback::FeedbackCollector;
use chunk::{read_chunk, read_length, ChunkId};
use header::ScoreHeader;

const SMUS_TAG_OFFSET: usize = 8;
const SHDR_OFFSET: usize = 12;

/// Where the variable chunks of a score live, plus its header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreLayout {
    pub header: ScoreHeader,
    /// First byte after the `SHDR` chunk
    pub body_start: usize,
    /// End of the `FORM` chunk, clamped to the buffer
    pub form_end: usize,
}

/// Check the fixed `FORM` / `SMUS` / `SHDR` prologue and decode the header.
pub fn open(buf: &[u8], feedback: &mut FeedbackCollector) -> Result<ScoreLayout> {
    if buf.len() < SHDR_OFFSET {
        return Err(Error::TooShort { len: buf.len() });
    }
    expect_tag(buf, 0, ChunkId::FORM)?;

    // The FORM length is only used to bound the chunk walk
    let declared_end = read_length(buf, 4).ok_or(Error::TooShort { len: buf.len() })?;
    let form_end = if declared_end > buf.len() {
        feedback.set_offset(0);
        feedback.warning(format!(
            "FORM declares {} bytes but the file has {}, reading what is there",
            declared_end,
            buf.len()
        ));
        buf.len()
    } else {
        declared_end
    };
    debug!(form_end, "FORM chunk found");

    expect_tag(buf, SMUS_TAG_OFFSET, ChunkId::SMUS)?;
    expect_tag(buf, SHDR_OFFSET, ChunkId::SHDR)?;

    let shdr = read_chunk(buf, SHDR_OFFSET)?;
    let header = ScoreHeader::parse(shdr.payload(buf))?;
    debug!(?header, "SHDR decoded");

    Ok(ScoreLayout {
        header,
        body_start: shdr.next_offset(),
        form_end,
    })
}

fn expect_tag(buf: &[u8], offset: usize, expected: ChunkId) -> Result<()> {
    match ChunkId::at(buf, offset) {
        Some(found) if found == expected => Ok(()),
        Some(found) => Err(Error::MissingTag {
            expected,
            found,
            offset,
        }),
        None => Err(Error::TooShort { len: buf.len() }),
    }
}

/// Decode ISO-8859-1 text, dropping trailing NUL padding.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    bytes[..end].iter().map(|&b| char::from(b)).collect()
}
