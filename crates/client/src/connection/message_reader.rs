use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::BytesMut;
use futures::Stream;
use http::Method;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Decoder;
use tokio_util::io::poll_read_buf;
use tracing::trace;

use crate::codec::ResponseDecoder;
use crate::protocol::{Message, ParseError, PayloadSize, ResponseHeader};

/// The read side of a client connection: the transport's read half, the bytes
/// buffered from it, and the decoder turning them into responses.
///
/// Used as a [`Stream`] of response messages. Once the transport reports end
/// of stream the decoder is asked to finish whatever is buffered, which is how
/// a close-delimited body ends.
#[derive(Debug)]
pub struct MessageReader<R> {
    reader: R,
    buffer: BytesMut,
    decoder: ResponseDecoder,
    read_size: usize,
    eof: bool,
}

impl<R> MessageReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a reader that continues from already buffered bytes.
    pub fn new(reader: R, buffer: BytesMut, read_size: usize) -> Self {
        Self { reader, buffer, decoder: ResponseDecoder::new(), read_size, eof: false }
    }

    /// Sets the method of the request the next response answers.
    pub fn expect(&mut self, method: Method) {
        self.decoder.expect(method);
    }

    /// Waits until at least one byte is buffered, without consuming anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails or reached end of stream.
    pub async fn readable(&mut self) -> Result<(), ParseError> {
        if !self.buffer.is_empty() {
            return Ok(());
        }
        if self.eof {
            return Err(ParseError::io(std::io::ErrorKind::UnexpectedEof));
        }

        self.reserve();
        let read = self.reader.read_buf(&mut self.buffer).await?;
        if read == 0 {
            self.eof = true;
            return Err(ParseError::io(std::io::ErrorKind::UnexpectedEof));
        }

        trace!(read, "connection readable");
        Ok(())
    }

    /// Gives back the read half and the bytes buffered but not yet parsed.
    pub fn into_parts(self) -> (R, BytesMut) {
        (self.reader, self.buffer)
    }

    fn reserve(&mut self) {
        if self.buffer.capacity() - self.buffer.len() < self.read_size / 2 {
            self.buffer.reserve(self.read_size);
        }
    }
}

impl<R> Stream for MessageReader<R>
where
    R: AsyncRead + Unpin,
{
    type Item = Result<Message<(ResponseHeader, PayloadSize)>, ParseError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.eof {
                return Poll::Ready(this.decoder.decode_eof(&mut this.buffer).transpose());
            }

            match this.decoder.decode(&mut this.buffer) {
                Ok(Some(message)) => return Poll::Ready(Some(Ok(message))),
                Ok(None) => {}
                Err(e) => return Poll::Ready(Some(Err(e))),
            }

            this.reserve();
            match ready!(poll_read_buf(Pin::new(&mut this.reader), cx, &mut this.buffer)) {
                Ok(0) => {
                    trace!("connection reached end of stream");
                    this.eof = true;
                }
                Ok(_) => {}
                Err(e) => return Poll::Ready(Some(Err(e.into()))),
            }
        }
    }
}
