use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;

use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, SinkExt, Stream, StreamExt};

use http_body::{Body, Frame, SizeHint};
use tracing::{error, trace};

use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, ResponseHeader};

type PayloadResult = Result<PayloadItem, ParseError>;

/// ResponseBody streams the body of a response read by a [`ClientConn`](crate::connection::ClientConn).
///
/// # Architecture
///
/// The buffered input of a connection is owned by its read loop, so the body
/// does not read from the transport itself. Instead:
/// - `ResponseBody`: consumer side, implements `http_body::Body`
/// - `ResponseBodySender`: producer side, run by the read loop over its payload stream
/// - each poll sends a oneshot sender through a mpsc channel, and the read loop
///   answers it with the next decoded payload item
///
/// Nothing is read from the connection until the consumer asks for it, so a
/// body that is dropped early leaves its remaining bytes unread on the wire.
pub struct ResponseBody {
    signal: mpsc::Sender<oneshot::Sender<PayloadResult>>,
    receiving: Option<oneshot::Receiver<PayloadResult>>,
    payload_size: PayloadSize,
    eof: bool,
}

impl ResponseBody {
    fn new(signal: mpsc::Sender<oneshot::Sender<PayloadResult>>, payload_size: PayloadSize) -> Self {
        Self { signal, receiving: None, payload_size, eof: false }
    }

    /// Creates a body streaming channel pair for one response.
    ///
    /// The returned `ResponseBody` is handed to the caller together with the
    /// response head, while the `ResponseBodySender` borrows the payload
    /// stream for as long as the read loop serves this body.
    pub(crate) fn body_channel<S>(payload_stream: &mut S, payload_size: PayloadSize) -> (ResponseBody, ResponseBodySender<'_, S>)
    where
        S: Stream + Unpin,
    {
        let (tx, receiver) = mpsc::channel(1);

        let body = ResponseBody::new(tx, payload_size);

        let body_sender = ResponseBodySender { payload_stream, receiver, eof: false };

        (body, body_sender)
    }
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBody").field("payload_size", &self.payload_size).field("eof", &self.eof).finish_non_exhaustive()
    }
}

/// ResponseBodySender answers chunk requests from a [`ResponseBody`].
///
/// It reads exactly one payload item per request, and stops once the payload
/// reached EOF or the body went away.
pub(crate) struct ResponseBodySender<'conn, S>
where
    S: Stream + Unpin,
{
    payload_stream: &'conn mut S,
    receiver: mpsc::Receiver<oneshot::Sender<PayloadResult>>,
    eof: bool,
}

impl<S> ResponseBodySender<'_, S>
where
    S: Stream<Item = Result<Message<(ResponseHeader, PayloadSize)>, ParseError>> + Unpin,
{
    /// Serves chunk requests until either:
    /// - The complete body is streamed (EOF)
    /// - The body is dropped by the consumer
    /// - An error occurs while reading the payload, which is forwarded to the body
    pub(crate) async fn send_body(&mut self) -> Result<(), ParseError> {
        while !self.eof {
            let Some(reply) = self.receiver.next().await else {
                trace!("response body dropped, stop serving payload");
                return Ok(());
            };

            match self.read_payload().await {
                Ok(payload_item) => {
                    self.eof = payload_item.is_eof();
                    if reply.send(Ok(payload_item)).is_err() {
                        trace!("response body dropped while a chunk was in flight");
                    }
                }

                Err(e) => {
                    error!(cause = %e, "failed to read response payload");
                    let reason = e.to_string();
                    if reply.send(Err(e)).is_err() {
                        trace!("response body dropped before receiving the payload error");
                    }
                    return Err(ParseError::invalid_body(reason));
                }
            }
        }

        Ok(())
    }

    async fn read_payload(&mut self) -> PayloadResult {
        match self.payload_stream.next().await {
            Some(Ok(Message::Payload(payload_item))) => Ok(payload_item),
            Some(Ok(Message::Header(_))) => {
                error!("received response head while reading body");
                Err(ParseError::invalid_body("received response head while reading body"))
            }
            Some(Err(e)) => Err(e),
            None => Err(ParseError::invalid_body("connection closed while reading body")),
        }
    }
}

/// Implements the standard HTTP body interface for response bodies.
impl Body for ResponseBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        loop {
            if self.eof {
                return Poll::Ready(None);
            }

            if let Some(oneshot_receiver) = &mut self.receiving {
                let received = ready!(oneshot_receiver.poll_unpin(cx));
                self.receiving.take();
                return match received {
                    Ok(Ok(PayloadItem::Chunk(bytes))) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
                    Ok(Ok(PayloadItem::Eof)) => {
                        self.eof = true;
                        Poll::Ready(None)
                    }
                    Ok(Err(e)) => Poll::Ready(Some(Err(e))),
                    Err(_canceled) => Poll::Ready(Some(Err(ParseError::invalid_body("read response body canceled")))),
                };
            }

            match ready!(self.signal.poll_ready_unpin(cx)) {
                Ok(()) => {
                    let (tx, rx) = oneshot::channel();
                    match self.signal.start_send(tx) {
                        Ok(()) => {
                            self.receiving = Some(rx);
                        }
                        Err(e) => return Poll::Ready(Some(Err(ParseError::invalid_body(e)))),
                    }
                }
                Err(e) => return Poll::Ready(Some(Err(ParseError::invalid_body(e)))),
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.eof
    }

    fn size_hint(&self) -> SizeHint {
        self.payload_size.into()
    }
}
