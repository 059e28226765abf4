//! The client side of a persistent, pipelined HTTP/1.1 connection
//!
//! This crate drives one established byte stream (TCP, TLS, a Unix socket,
//! ...) as a keep-alive HTTP/1.1 connection on top of tokio. It writes
//! requests, hands out the responses in the order the requests were written,
//! tracks whether each response body was read to its end, and keeps the
//! connection's error state once it can no longer be used.
//!
//! Dialing, pooling several connections, retries and redirects are left to the
//! code using it: a dead connection is reported, never repaired.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::Request;
//! use http_body_util::{BodyExt, Empty};
//! use micro_client::connection::ClientConn;
//! use tokio::net::TcpStream;
//! use tracing::{info, warn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = TcpStream::connect("127.0.0.1:8080").await?;
//!     let conn = ClientConn::new(stream);
//!
//!     for path in ["/", "/status"] {
//!         let request = Request::get(format!("http://127.0.0.1:8080{path}")).body(Empty::<Bytes>::new())?;
//!         let response = conn.send_request(request).await?;
//!         info!(status = %response.status(), "received response");
//!
//!         // the body must be read to its end before the next request
//!         let body = response.into_body().collect().await?.to_bytes();
//!         info!(len = body.len(), "read body");
//!     }
//!
//!     if let Err(e) = conn.ping() {
//!         warn!(cause = %e, "connection can't be reused");
//!     }
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: [`ClientConn`](connection::ClientConn), its read loop and configuration
//! - [`protocol`]: message types, response bodies and errors
//! - [`codec`]: request encoding and response decoding
//!
//! ## Exchanges
//!
//! Only one exchange is in flight at a time. [`ClientConn::write`](connection::ClientConn::write)
//! refuses a request with [`ClientError::BodyStillPending`](protocol::ClientError::BodyStillPending)
//! while the previous response body is being read. Dropping a body before its
//! end leaves unread bytes on the wire, so the connection is given up with
//! [`ClientError::DataLeftInBuffer`](protocol::ClientError::DataLeftInBuffer).
//!
//! ## Errors
//!
//! - [`protocol::ClientError`]: what a connection operation failed with; sticky
//!   once the connection is unusable
//! - [`protocol::ParseError`]: response parsing errors
//! - [`protocol::SendError`]: request sending errors
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - Maximum response head size: 8KB
//! - Maximum number of response headers: 64
//! - A response without a body is not handed out to the caller, a read waiting
//!   for one is only ended by its cancellation or the read timeout

pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
