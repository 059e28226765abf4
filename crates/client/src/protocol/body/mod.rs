//! HTTP response body handling implementation.
//!
//! This module provides the body types handed to callers of a
//! [`ClientConn`](crate::connection::ClientConn):
//!
//! - [`ResponseBody`]: streams payload chunks on demand from the connection's read loop
//! - [`DrainSignal`]: wraps a body and reports whether it was read to its end or
//!   abandoned, which decides if the connection can carry another exchange
//!
//! A response body returned by the connection is an [`IncomingBody`], the
//! combination of both.

mod drain_signal;
mod response_body;

pub use drain_signal::DrainSignal;
pub use response_body::ResponseBody;

/// The body type of responses returned by a [`ClientConn`](crate::connection::ClientConn).
pub type IncomingBody = DrainSignal<ResponseBody>;
