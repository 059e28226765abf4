//! Decoder implementation for HTTP chunked transfer encoding.
//!
//! Decodes response bodies sent with `Transfer-Encoding: chunked` as specified in
//! [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112#section-7.1).
//! Chunk extensions and trailer fields are validated for framing and dropped.

use std::cmp;

use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

/// A decoder for a chunked response body.
///
/// Chunk data is handed out as soon as it arrives, so a single chunk on the wire
/// may be split over several [`PayloadItem::Chunk`] items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
}

impl ChunkedDecoder {
    /// Creates a new decoder positioned before the first chunk size line.
    pub fn new() -> Self {
        Self { state: ChunkedState::SizeStart, remaining_size: 0 }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// First hex digit of the chunk size
    SizeStart,
    /// Further hex digits of the chunk size
    Size,
    /// Whitespace after the chunk size
    SizeLws,
    /// Chunk extension, ignored up to CR
    Extension,
    /// LF ending the size line
    SizeLf,
    /// Chunk data
    Body,
    /// CR after chunk data
    BodyCr,
    /// LF after chunk data
    BodyLf,
    /// Trailer field, ignored up to CR
    Trailer,
    /// LF ending a trailer field
    TrailerLf,
    /// CR of the final empty line, or the start of a trailer field
    EndCr,
    /// LF of the final empty line
    EndLf,
    /// The whole body has been read
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Decodes chunked data from the input buffer.
    ///
    /// # Returns
    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` when chunk data is available
    /// - `Ok(Some(PayloadItem::Eof))` once the last chunk and trailers were read
    /// - `Ok(None)` when more data is needed
    /// - `Err(ParseError)` if the framing is invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                ChunkedState::End => {
                    trace!("finished reading chunked data");
                    return Ok(Some(PayloadItem::Eof));
                }

                ChunkedState::Body => {
                    if src.is_empty() {
                        return Ok(None);
                    }

                    let len = cmp::min(self.remaining_size, src.len() as u64);
                    self.remaining_size -= len;
                    if self.remaining_size == 0 {
                        self.state = ChunkedState::BodyCr;
                    }

                    #[allow(clippy::cast_possible_truncation, reason = "len is bounded by src.len()")]
                    let bytes = src.split_to(len as usize).freeze();
                    trace!(len = bytes.len(), "read chunked bytes");
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }

                state => {
                    let Some(&byte) = src.first() else {
                        return Ok(None);
                    };
                    src.advance(1);
                    self.state = self.step(state, byte)?;
                }
            }
        }
    }
}

impl ChunkedDecoder {
    /// Moves the framing state machine forward by one byte.
    fn step(&mut self, state: ChunkedState, byte: u8) -> Result<ChunkedState, ParseError> {
        use ChunkedState::*;

        let next = match (state, byte) {
            (SizeStart | Size, b) if b.is_ascii_hexdigit() => {
                self.push_size_digit(b)?;
                Size
            }
            (Size | SizeLws, b'\t' | b' ') => SizeLws,
            (Size | SizeLws, b';') => Extension,
            (Size | SizeLws | Extension, b'\r') => SizeLf,
            (Extension, b'\n') => return Err(ParseError::invalid_body("invalid chunk extension contains newline")),
            (Extension, _) => Extension,
            (SizeLf, b'\n') if self.remaining_size == 0 => EndCr,
            (SizeLf, b'\n') => Body,
            (BodyCr, b'\r') => BodyLf,
            (BodyLf, b'\n') => SizeStart,
            (EndCr, b'\r') => EndLf,
            (Trailer, b'\r') => TrailerLf,
            (EndCr | Trailer, _) => Trailer,
            (TrailerLf, b'\n') => EndCr,
            (EndLf, b'\n') => End,
            (state, byte) => {
                return Err(ParseError::invalid_body(format!("invalid chunked framing: unexpected byte {byte:#04x} in state {state:?}")));
            }
        };

        Ok(next)
    }

    fn push_size_digit(&mut self, digit: u8) -> Result<(), ParseError> {
        let value = match digit {
            b'0'..=b'9' => digit - b'0',
            b'a'..=b'f' => digit - b'a' + 10,
            _ => digit - b'A' + 10,
        };

        self.remaining_size = self
            .remaining_size
            .checked_mul(16)
            .and_then(|size| size.checked_add(u64::from(value)))
            .ok_or_else(|| ParseError::invalid_body("invalid overflow chunked length"))?;
        Ok(())
    }
}
