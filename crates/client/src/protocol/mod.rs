//! Core HTTP protocol abstractions for the client side of a connection.
//!
//! # Architecture
//!
//! - **Message Handling** ([`message`]): Core message types and payload processing
//!   - [`Message`]: Represents either a head or a payload chunk
//!   - [`PayloadItem`]: Handles individual payload chunks and EOF
//!   - [`PayloadSize`]: Tracks payload size information
//!
//! - **Request Processing** ([`request`]): Request head handling
//!   - [`RequestHeader`]: Wraps HTTP request heads with target rendering and persistence rules
//!   - [`RequestForm`]: Origin-form or absolute-form request targets
//!
//! - **Response Processing** ([`response`]): Response head handling
//!   - [`ResponseHeader`]: Wraps a decoded response head
//!
//! - **Body Streaming** ([`body`]): Response body streaming and drain tracking
//!
//! - **Error Handling** ([`error`]):
//!   - [`ClientError`]: Errors returned by a connection, sticky once recorded
//!   - [`ParseError`]: Response parsing errors
//!   - [`SendError`]: Request sending errors

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestForm;
pub use request::RequestHeader;
pub(crate) use request::wants_close;

mod response;
pub use response::ResponseHead;
pub use response::ResponseHeader;

mod error;
pub use error::ClientError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
