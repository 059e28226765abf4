use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::protocol::{PayloadItem, PayloadSize, SendError};
use bytes::{Buf, BytesMut};

use tokio_util::codec::Encoder;

/// Frames a request body the way its head announced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadEncoder {
    Length(LengthEncoder),
    Chunked(ChunkedEncoder),
    Empty,
}

impl PayloadEncoder {
    /// Returns true once the whole body was written.
    pub fn is_finish(&self) -> bool {
        match self {
            PayloadEncoder::Length(encoder) => encoder.is_finish(),
            PayloadEncoder::Chunked(encoder) => encoder.is_finish(),
            PayloadEncoder::Empty => true,
        }
    }
}

/// A request body can't be close-delimited, the server would never see its end.
impl TryFrom<PayloadSize> for PayloadEncoder {
    type Error = SendError;

    fn try_from(payload_size: PayloadSize) -> Result<Self, Self::Error> {
        match payload_size {
            PayloadSize::Length(size) => Ok(PayloadEncoder::Length(LengthEncoder::new(size))),
            PayloadSize::Chunked => Ok(PayloadEncoder::Chunked(ChunkedEncoder::new())),
            PayloadSize::Empty => Ok(PayloadEncoder::Empty),
            PayloadSize::UntilClose => Err(SendError::invalid_body("a request body can't be delimited by closing the connection")),
        }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match self {
            PayloadEncoder::Length(encoder) => encoder.encode(item, dst),
            PayloadEncoder::Chunked(encoder) => encoder.encode(item, dst),
            PayloadEncoder::Empty => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_from_payload_size() {
        assert!(PayloadEncoder::try_from(PayloadSize::Empty).unwrap().is_finish());
        assert!(!PayloadEncoder::try_from(PayloadSize::Chunked).unwrap().is_finish());
        assert!(!PayloadEncoder::try_from(PayloadSize::Length(1)).unwrap().is_finish());
        assert!(PayloadEncoder::try_from(PayloadSize::UntilClose).is_err());
    }
}
