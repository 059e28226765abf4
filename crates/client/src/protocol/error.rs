use std::io;
use std::sync::Arc;

use http::Version;
use thiserror::Error;

/// Errors surfaced by a [`ClientConn`](crate::connection::ClientConn).
///
/// Once recorded as a connection's read or write error a value is sticky: it is
/// handed out again by every later liveness check, which is why the variant
/// payloads are shared behind `Arc`.
#[derive(Debug, Error, Clone)]
pub enum ClientError {
    #[error("persistent connection closed")]
    FinalRequest,

    #[error("connection closed by user")]
    Closed,

    #[error("body data waiting for read")]
    BodyStillPending,

    #[error("some data left in the buffer")]
    DataLeftInBuffer,

    #[error("server closed connection")]
    ServerClosed,

    #[error("request canceled")]
    Canceled,

    #[error("timed out waiting for response")]
    TimedOut,

    #[error("request error: {source}")]
    Send {
        #[from]
        source: Arc<SendError>,
    },

    #[error("response error: {source}")]
    Parse {
        #[from]
        source: Arc<ParseError>,
    },
}

impl From<SendError> for ClientError {
    fn from(e: SendError) -> Self {
        Self::Send { source: Arc::new(e) }
    }
}

impl From<ParseError> for ClientError {
    fn from(e: ParseError) -> Self {
        Self::Parse { source: Arc::new(e) }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http status: {0:?}")]
    InvalidStatus(Option<u16>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("missing host: request has no Host header and no authority in its uri")]
    MissingHost,

    #[error("unsupported http version: {0:?}")]
    UnsupportedVersion(Version),

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
