//! Decoder for response payloads.
//!
//! Picks the framing announced by the response head:
//! - Content-Length: [`LengthDecoder`]
//! - chunked transfer encoding: [`ChunkedDecoder`]
//! - close-delimited: everything until the server closes the connection

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

/// A decoder for one response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadDecoder {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    /// `done` is set once EOF was handed out
    UntilClose { done: bool },
    Empty,
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(size) => PayloadDecoder::Length(LengthDecoder::new(size)),
            PayloadSize::Chunked => PayloadDecoder::Chunked(ChunkedDecoder::new()),
            PayloadSize::UntilClose => PayloadDecoder::UntilClose { done: false },
            PayloadSize::Empty => PayloadDecoder::Empty,
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self {
            PayloadDecoder::Length(decoder) => decoder.decode(src),
            PayloadDecoder::Chunked(decoder) => decoder.decode(src),
            PayloadDecoder::UntilClose { done: true } | PayloadDecoder::Empty => Ok(Some(PayloadItem::Eof)),
            PayloadDecoder::UntilClose { done: false } if src.is_empty() => Ok(None),
            PayloadDecoder::UntilClose { done: false } => Ok(Some(PayloadItem::Chunk(src.split().freeze()))),
        }
    }

    /// Called once the server closed the connection.
    ///
    /// A close-delimited body ends here, while a framed body that is still
    /// incomplete is an error.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let PayloadDecoder::UntilClose { done } = self {
            if !src.is_empty() {
                return Ok(Some(PayloadItem::Chunk(src.split().freeze())));
            }
            trace!("close-delimited body finished by end of stream");
            *done = true;
            return Ok(Some(PayloadItem::Eof));
        }

        self.decode(src)?
            .map(Some)
            .ok_or_else(|| ParseError::invalid_body("connection closed before the response body was complete"))
    }
}
