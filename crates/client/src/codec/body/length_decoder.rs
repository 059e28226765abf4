//! Decoder for response bodies framed by a `Content-Length` header, see
//! [RFC 9112 Section 6.2](https://www.rfc-editor.org/rfc/rfc9112#section-6.2).

use std::cmp;

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Hands out at most `length` bytes, then reports EOF.
///
/// Bytes past the declared length belong to the next response and are left in
/// the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }

    /// Returns the number of body bytes still expected.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = cmp::min(self.remaining, src.len() as u64);
        #[allow(clippy::cast_possible_truncation, reason = "len is bounded by src.len()")]
        let bytes = src.split_to(len as usize).freeze();

        self.remaining -= len;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}
