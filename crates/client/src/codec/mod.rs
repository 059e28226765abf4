//! HTTP codec module for the client side of a connection
//!
//! - [`RequestEncoder`]: encodes outgoing requests, the head through the
//!   [`header`] encoder and the body through the [`body`] payload encoders
//! - [`ResponseDecoder`]: decodes incoming responses, the head through the
//!   [`header`] decoder and the body through the [`body`] payload decoders
//!
//! Both are `tokio_util` codecs working on [`Message`](crate::protocol::Message)s,
//! so a head is followed by the payload items of its body.

mod body;
mod header;
mod request_encoder;
mod response_decoder;

pub use body::{PayloadDecoder, PayloadEncoder};
pub use header::{HeaderDecoder, HeaderEncoder};
pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
