//! Head encoding and decoding
//!
//! - [`HeaderDecoder`]: decodes response heads and works out how their body is framed
//! - [`HeaderEncoder`]: encodes request heads, with the request line in origin
//!   or absolute form

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
