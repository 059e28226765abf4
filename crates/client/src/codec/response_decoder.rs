//! HTTP response decoder module
//!
//! Decodes the responses arriving on a client connection: the head first,
//! then the payload chunks of its body, if any.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use http::Method;
//! use micro_client::codec::ResponseDecoder;
//! use micro_client::protocol::Message;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = ResponseDecoder::new();
//! decoder.expect(Method::GET);
//!
//! let mut buffer = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok");
//! let Some(Message::Header((header, payload_size))) = decoder.decode(&mut buffer).unwrap() else {
//!     panic!("expected a response head");
//! };
//! assert_eq!(header.status(), 200);
//! assert!(!payload_size.is_empty());
//! ```

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, ResponseHeader};
use bytes::BytesMut;
use http::Method;
use tokio_util::codec::Decoder;

/// A decoder for HTTP responses that handles both heads and payloads
///
/// The decoder operates in two phases:
/// 1. Head parsing: decodes the response head using [`HeaderDecoder`]
/// 2. Payload parsing: if the response has a body, decodes it using [`PayloadDecoder`]
///
/// A response without a body goes straight back to head parsing, so no
/// payload item is produced for it.
#[derive(Debug, Default)]
pub struct ResponseDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the method of the request the next response answers, which
    /// decides whether that response can have a body.
    pub fn expect(&mut self, method: Method) {
        self.header_decoder.expect(method);
    }

    /// Returns true while a response body is being decoded.
    pub fn is_decoding_payload(&self) -> bool {
        self.payload_decoder.is_some()
    }

    fn payload_message(&mut self, item: Option<PayloadItem>) -> Option<Message<(ResponseHeader, PayloadSize)>> {
        if matches!(item, Some(PayloadItem::Eof)) {
            self.payload_decoder.take();
        }
        item.map(Message::Payload)
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(ResponseHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode(src)?;
            return Ok(self.payload_message(item));
        }

        let message = match self.header_decoder.decode(src)? {
            Some((header, payload_size)) => {
                if !payload_size.is_empty() {
                    self.payload_decoder = Some(payload_size.into());
                }
                Some(Message::Header((header, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode_eof(src)?;
            return Ok(self.payload_message(item));
        }

        if src.is_empty() {
            return Ok(None);
        }

        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None => Err(ParseError::invalid_header("connection closed before the response head was complete")),
        }
    }
}
