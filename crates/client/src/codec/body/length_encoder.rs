use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

/// Writes a request body of a declared `Content-Length`.
///
/// A body that yields more or fewer bytes than declared is rejected, since the
/// server would otherwise misread where the next request starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    remaining: u64,
    eof: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length, eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(mut bytes) => {
                let len = bytes.remaining() as u64;
                if len > self.remaining {
                    return Err(SendError::invalid_body(format!("body exceeds content-length by {} bytes", len - self.remaining)));
                }

                self.remaining -= len;
                while bytes.has_remaining() {
                    let chunk = bytes.chunk();
                    let chunk_len = chunk.len();
                    dst.extend_from_slice(chunk);
                    bytes.advance(chunk_len);
                }
                Ok(())
            }
            PayloadItem::Eof => {
                if self.remaining > 0 {
                    return Err(SendError::invalid_body(format!("body ended {} bytes short of content-length", self.remaining)));
                }
                self.eof = true;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn exact_body() {
        let mut encoder = LengthEncoder::new(5);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hel")), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"lo")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        assert!(encoder.is_finish());
        assert_eq!(&dst[..], b"hello");
    }

    #[test]
    fn mismatched_body() {
        let mut dst = BytesMut::new();

        let mut encoder = LengthEncoder::new(2);
        assert!(encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hello")), &mut dst).is_err());

        let mut encoder = LengthEncoder::new(8);
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hello")), &mut dst).unwrap();
        assert!(encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).is_err());
        assert!(!encoder.is_finish());
    }
}
