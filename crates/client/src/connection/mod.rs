//! The client side of a persistent HTTP/1.1 connection
//!
//! # Components
//!
//! - [`ClientConn`]: writes requests, hands out responses in order, and keeps
//!   the sticky error state once the connection becomes unusable
//! - [`Builder`]: request form, buffer sizes and read timeout of a connection
//!
//! Internally a connection is made of:
//!
//! - the write path, a `MessageWriter` over the transport's write half
//! - the read loop, a background task owning a `MessageReader` over the read half
//! - the shared state both sides record errors and the body-reading flag in
//! - two single slot queues between them: written requests go to the read loop,
//!   parsed responses come back

mod builder;
mod client_conn;
mod message_reader;
mod message_writer;
mod read_loop;
mod state;

pub use builder::Builder;
pub use client_conn::ClientConn;
