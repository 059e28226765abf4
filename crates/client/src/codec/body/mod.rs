//! Payload framing for request and response bodies
//!
//! # Components
//!
//! ## Decoders (response bodies)
//! - `ChunkedDecoder`: chunked transfer encoding
//! - `LengthDecoder`: fixed `Content-Length` payloads
//! - [`PayloadDecoder`]: picks one of the above, or a close-delimited body
//!
//! ## Encoders (request bodies)
//! - `ChunkedEncoder`: chunked transfer encoding
//! - `LengthEncoder`: fixed `Content-Length` payloads
//! - [`PayloadEncoder`]: picks one of the above

mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
