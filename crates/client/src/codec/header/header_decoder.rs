//! Decoder for HTTP response heads.
//!
//! Parses the status line and header fields of a response with `httparse`, and
//! works out how the body that follows is framed. Framing depends on the
//! request the response answers, so the decoder is told the request method
//! before each response.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum head size: 8KB
//! - Only HTTP/1.0 and HTTP/1.1 responses are accepted
//!
//! Header names and values are first recorded as byte ranges of the input, so
//! that the head can be split off the buffer once and every value shares it.

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Method, Response, StatusCode, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, ResponseHeader};

/// Maximum number of headers allowed in a response
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire head
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for response heads implementing the [`Decoder`] trait.
///
/// Yields the [`ResponseHeader`] together with the [`PayloadSize`] of its body.
#[derive(Debug, Clone)]
pub struct HeaderDecoder {
    request_method: Method,
}

impl HeaderDecoder {
    pub fn new() -> Self {
        Self { request_method: Method::GET }
    }

    /// Sets the method of the request the next response answers.
    pub fn expect(&mut self, method: Method) {
        self.request_method = method;
    }

    pub fn request_method(&self) -> &Method {
        &self.request_method
    }
}

impl Default for HeaderDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for HeaderDecoder {
    type Item = (ResponseHeader, PayloadSize);
    type Error = ParseError;

    /// Attempts to decode a response head from the provided bytes buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((header, payload_size)))` if a complete head was parsed
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` if parsing failed
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if:
    /// - The number of headers exceeds `MAX_HEADER_NUM`
    /// - The head size exceeds `MAX_HEADER_BYTES`
    /// - The HTTP version or status code is not supported
    /// - The body framing headers are invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut res = httparse::Response::new(&mut headers);

        let parsed_result = res.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            Error::Version => ParseError::InvalidVersion(None),
            Error::Status => ParseError::InvalidStatus(None),
            e => ParseError::invalid_header(e.to_string()),
        });

        let head_size = match parsed_result? {
            Status::Complete(head_size) => head_size,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(head_size, "parsed response head");
        ensure!(head_size <= MAX_HEADER_BYTES, ParseError::too_large_header(head_size, MAX_HEADER_BYTES));

        let version = match res.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            v => return Err(ParseError::InvalidVersion(v)),
        };

        let status = res
            .code
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or(ParseError::InvalidStatus(res.code))?;

        let header_count = res.headers.len();
        let mut header_index = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];
        HeaderIndex::record(src, res.headers, &mut header_index);

        let mut head = Response::new(());
        *head.status_mut() = status;
        *head.version_mut() = version;

        let header_bytes = src.split_to(head_size).freeze();
        let headers = head.headers_mut();
        headers.reserve(header_count);
        for index in &header_index[..header_count] {
            let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1]).map_err(ParseError::invalid_header)?;
            let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
                .map_err(ParseError::invalid_header)?;
            headers.append(name, value);
        }

        let header = ResponseHeader::from(head);
        let payload_size = parse_payload(&header, &self.request_method)?;

        Ok(Some((header, payload_size)))
    }
}

/// Byte ranges of one header's name and value within the parsed buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, indices) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            indices.name = (name_start, name_start + header.name.len());
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            indices.value = (value_start, value_start + header.value.len());
        }
    }
}

/// Works out how the response body is framed, following
/// [RFC 9112 Section 6.3](https://www.rfc-editor.org/rfc/rfc9112#section-6.3).
///
/// - responses to HEAD, 1xx, 204, 304 and 2xx responses to CONNECT have no body
/// - `Transfer-Encoding` ending in `chunked`: chunked body
/// - any other `Transfer-Encoding`, or no framing header at all: the body runs
///   until the server closes the connection
/// - `Content-Length`: fixed length body
///
/// # Errors
///
/// Returns `ParseError` if both framing headers are present or the
/// content length is not a number.
fn parse_payload(header: &ResponseHeader, request_method: &Method) -> Result<PayloadSize, ParseError> {
    let status = header.status();
    let bodyless = *request_method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
        || (*request_method == Method::CONNECT && status.is_success());
    if bodyless {
        return Ok(PayloadSize::Empty);
    }

    let headers = header.headers();
    match (headers.get(http::header::TRANSFER_ENCODING), headers.get(http::header::CONTENT_LENGTH)) {
        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("both transfer-encoding and content-length are present")),
        (Some(te), None) if is_chunked(Some(te)) => Ok(PayloadSize::Chunked),
        (Some(_), None) | (None, None) => Ok(PayloadSize::UntilClose),
        (None, Some(cl)) => {
            let length = cl
                .to_str()
                .ok()
                .and_then(|cl| cl.trim().parse::<u64>().ok())
                .ok_or_else(|| ParseError::invalid_content_length(format!("{cl:?} is not a valid length")))?;
            Ok(PayloadSize::new_length(length))
        }
    }
}

/// Returns true if chunked is the final encoding in the Transfer-Encoding header.
fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    header_value
        .and_then(|value| value.as_bytes().rsplit(|b| *b == b',').next())
        .is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(CHUNKED))
}
