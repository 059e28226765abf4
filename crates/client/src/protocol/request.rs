//! HTTP request head handling implementation.
//!
//! This module provides the core abstractions for handling the head of an outgoing
//! HTTP request. It wraps the standard `http::Request` type to provide the extra
//! functionality the client connection needs: the request target in the form the
//! connection is configured for, and whether the request ends the connection.

use std::borrow::Cow;

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version, header};

/// How the request target is written on the request line.
///
/// A connection talking directly to the origin uses [`RequestForm::Origin`]
/// (`GET /path?q HTTP/1.1`), while a connection to a forward proxy uses
/// [`RequestForm::Absolute`] (`GET http://host/path?q HTTP/1.1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestForm {
    #[default]
    Origin,
    Absolute,
}

/// Represents an HTTP request head.
///
/// This struct wraps a `http::Request<()>` to provide:
/// - Access to standard HTTP header fields
/// - Conversion from different request formats
/// - Request target rendering for the request line
/// - Connection persistence inspection
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body to this header, converting it into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|()| body)
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns a mutable reference to the request's headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    /// Determines if this request normally carries a body based on its HTTP method.
    ///
    /// Returns false for methods that typically don't have bodies:
    /// - GET
    /// - HEAD
    /// - DELETE
    /// - OPTIONS
    /// - CONNECT
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT)
    }

    /// Returns true if this request asks for the connection to be closed after the exchange.
    ///
    /// HTTP/1.0 requests close unless they carry `Connection: keep-alive`,
    /// HTTP/1.1 requests close only when they carry `Connection: close`.
    pub fn wants_close(&self) -> bool {
        wants_close(self.version(), self.headers())
    }

    /// Renders the request target for the request line.
    ///
    /// `CONNECT` always uses the authority form. Absolute form falls back to
    /// origin form when the URI has no scheme or authority to write.
    pub fn request_target(&self, form: RequestForm) -> Cow<'_, str> {
        let uri = self.uri();

        if *self.method() == Method::CONNECT {
            if let Some(authority) = uri.authority() {
                return Cow::Borrowed(authority.as_str());
            }
        }

        if form == RequestForm::Absolute && uri.scheme().is_some() && uri.authority().is_some() {
            return Cow::Owned(uri.to_string());
        }

        match uri.path_and_query() {
            Some(path_and_query) if !path_and_query.as_str().is_empty() => Cow::Borrowed(path_and_query.as_str()),
            _ => Cow::Borrowed("/"),
        }
    }
}

/// Converts request parts into a RequestHeader.
impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

/// Shared persistence rule for request and response heads.
pub(crate) fn wants_close(version: Version, headers: &HeaderMap) -> bool {
    match version {
        Version::HTTP_10 | Version::HTTP_09 => !has_connection_token(headers, "keep-alive"),
        _ => has_connection_token(headers, "close"),
    }
}

/// Returns true if any `Connection` header lists `token`, ignoring case.
pub(crate) fn has_connection_token(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|item| item.trim().eq_ignore_ascii_case(token))
}
