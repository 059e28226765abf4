//! HTTP response head handling implementation.
//!
//! The head of a response is decoded before its body is known, so it is kept
//! as a `http::Response<()>` and turned into a full response once the body has
//! been wired up by the connection.

use http::response::Parts;
use http::{HeaderMap, Response, StatusCode, Version};

use crate::protocol::request::wants_close;

/// Type alias for the raw response head as produced by the `http` crate.
pub type ResponseHead = Response<()>;

/// Represents a decoded HTTP response head.
#[derive(Debug)]
pub struct ResponseHeader {
    inner: ResponseHead,
}

impl AsRef<ResponseHead> for ResponseHeader {
    fn as_ref(&self) -> &ResponseHead {
        &self.inner
    }
}

impl ResponseHeader {
    /// Consumes the header and returns the inner `Response<()>`.
    pub fn into_inner(self) -> ResponseHead {
        self.inner
    }

    /// Attaches a body to this header, converting it into a full `Response<T>`.
    pub fn body<T>(self, body: T) -> Response<T> {
        self.inner.map(|()| body)
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns true for non-final (1xx) responses.
    pub fn is_informational(&self) -> bool {
        self.status().is_informational()
    }

    /// Returns true if the server announced that it closes the connection after this response.
    pub fn wants_close(&self) -> bool {
        wants_close(self.version(), self.headers())
    }
}

impl From<ResponseHead> for ResponseHeader {
    #[inline]
    fn from(inner: ResponseHead) -> Self {
        Self { inner }
    }
}

impl From<Parts> for ResponseHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Response::from_parts(parts, ()) }
    }
}
