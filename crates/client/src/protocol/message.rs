use bytes::{Buf, Bytes};
use http_body::SizeHint;

/// One item of a message stream: a head, or a piece of the body that follows it.
///
/// Requests are encoded as `Message<(RequestHeader, PayloadSize), D>` with the
/// data type of the caller's body, responses are decoded as
/// `Message<(ResponseHeader, PayloadSize)>`.
#[derive(Debug)]
pub enum Message<T, Data: Buf = Bytes> {
    Header(T),
    Payload(PayloadItem<Data>),
}

/// A body chunk, or the end of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    Chunk(Data),
    Eof,
}

/// How a message body is delimited on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// `Content-Length` body
    Length(u64),
    /// `Transfer-Encoding: chunked` body
    Chunked,
    /// No body
    Empty,
    /// Everything until the server closes the connection, responses only
    UntilClose,
}

impl PayloadSize {
    /// A zero length is the same as no body.
    #[inline]
    pub fn new_length(length: u64) -> Self {
        if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) }
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }

    #[inline]
    pub fn is_until_close(&self) -> bool {
        matches!(self, PayloadSize::UntilClose)
    }
}

/// Frames an outgoing body from its size hint: exact sizes get a
/// `Content-Length`, unknown sizes are chunked.
impl From<SizeHint> for PayloadSize {
    fn from(size_hint: SizeHint) -> Self {
        size_hint.exact().map_or(PayloadSize::Chunked, PayloadSize::new_length)
    }
}

impl From<PayloadSize> for SizeHint {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(length) => SizeHint::with_exact(length),
            PayloadSize::Empty => SizeHint::with_exact(0),
            PayloadSize::Chunked | PayloadSize::UntilClose => SizeHint::new(),
        }
    }
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    /// Returns the chunk data, `None` at the end of the body.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
