use std::fmt::Display;

use bytes::{Buf, BytesMut};
use http::Request;
use http_body::Body;
use http_body_util::BodyExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::codec::RequestEncoder;
use crate::protocol::{Message, PayloadItem, PayloadSize, RequestForm, RequestHeader, SendError};

/// Encodes requests into a write buffer and flushes them onto the transport.
#[derive(Debug)]
pub struct MessageWriter<W> {
    writer: W,
    buffer: BytesMut,
    encoder: RequestEncoder,
}

impl<W> MessageWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn with_capacity(writer: W, form: RequestForm, buffer_size: usize) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(buffer_size), encoder: RequestEncoder::new(form) }
    }

    /// Gives the transport back, dropping anything that was not flushed.
    pub fn into_inner(self) -> W {
        self.writer
    }

    #[inline]
    pub fn write<D>(&mut self, item: Message<(RequestHeader, PayloadSize), D>) -> Result<(), SendError>
    where
        D: Buf,
    {
        self.encoder.encode(item, &mut self.buffer)
    }

    #[inline]
    pub async fn flush(&mut self) -> Result<(), SendError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.writer.write_all(self.buffer.as_ref()).await?;
        self.buffer.clear();
        Ok(self.writer.flush().await?)
    }

    /// Serializes a whole request, streaming its body frame by frame.
    ///
    /// The body is framed by its size hint: an exact size is sent with
    /// `Content-Length`, anything else with chunked transfer encoding.
    /// Trailer frames are not sent.
    pub async fn send_request<B>(&mut self, request: Request<B>) -> Result<(), SendError>
    where
        B: Body + Unpin,
        B::Error: Display,
    {
        let (parts, mut body) = request.into_parts();
        let payload_size = PayloadSize::from(body.size_hint());

        self.write(Message::<_, B::Data>::Header((RequestHeader::from(parts), payload_size)))?;
        if payload_size.is_empty() {
            return self.flush().await;
        }

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    let Ok(data) = frame.into_data() else {
                        trace!("skip request trailers");
                        continue;
                    };
                    self.write(Message::Payload(PayloadItem::Chunk(data)))?;
                    self.flush().await?;
                }
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve request body error: {e}"))),
                None => {
                    self.write(Message::Payload(PayloadItem::<B::Data>::Eof))?;
                    return self.flush().await;
                }
            }
        }
    }
}
