//! The background task reading responses off a client connection.
//!
//! The loop owns the read side of the transport. For every request handed over
//! by the write path it parses the matching response, publishes it together
//! with a body wired to a [`DrainSignal`], and waits until that body was read
//! to its end or abandoned before it looks at the connection again.
//!
//! It stops for good on the first failure, after the last exchange the
//! connection can carry, or when teardown is signalled. In every case it hands
//! the read side back, so a hijacking owner can recover the transport.

use std::sync::Arc;

use futures::StreamExt;
use http::{Method, Response};
use tokio::io::AsyncRead;
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::connection::message_reader::MessageReader;
use crate::connection::state::SharedState;
use crate::protocol::body::{DrainSignal, IncomingBody, ResponseBody};
use crate::protocol::{ClientError, Message, ParseError, PayloadSize, ResponseHeader};

/// What the read loop needs to know about a request that was written.
#[derive(Debug, Clone)]
pub(crate) struct InFlightRequest {
    pub(crate) method: Method,
    pub(crate) wants_close: bool,
}

/// Why the read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stopped {
    /// Teardown was signalled by the owner
    Teardown,
    /// The owner went away
    Released,
    /// The previous exchange was the last one
    LastExchange,
    /// A response body was closed before its end
    Abandoned,
    /// A read error was recorded
    Failed,
}

pub(crate) struct ReadLoop<R> {
    reader: MessageReader<R>,
    state: Arc<SharedState>,
    requests: mpsc::Receiver<InFlightRequest>,
    responses: mpsc::Sender<Response<IncomingBody>>,
    teardown: CancellationToken,
}

impl<R> ReadLoop<R>
where
    R: AsyncRead + Unpin,
{
    pub(crate) fn new(
        reader: MessageReader<R>,
        state: Arc<SharedState>,
        requests: mpsc::Receiver<InFlightRequest>,
        responses: mpsc::Sender<Response<IncomingBody>>,
        teardown: CancellationToken,
    ) -> Self {
        Self { reader, state, requests, responses, teardown }
    }

    /// Runs until the loop stops, then gives the read side back.
    pub(crate) async fn run(mut self) -> MessageReader<R> {
        let stopped = self.serve().await;
        debug!(?stopped, "read loop stopped");
        self.reader
    }

    async fn serve(&mut self) -> Stopped {
        let mut alive = true;

        while alive {
            // wait until the server sends something
            select! {
                biased;
                () = self.teardown.cancelled() => return Stopped::Teardown,
                readable = self.reader.readable() => {
                    if let Err(e) = readable {
                        info!(cause = %e, "server closed connection");
                        self.state.set_read_error(ClientError::ServerClosed);
                        return Stopped::Failed;
                    }
                }
            }

            let request = select! {
                biased;
                () = self.teardown.cancelled() => return Stopped::Teardown,
                request = self.requests.recv() => match request {
                    Some(request) => request,
                    None => return Stopped::Released,
                },
            };

            self.reader.expect(request.method.clone());
            let message = select! {
                biased;
                () = self.teardown.cancelled() => return Stopped::Teardown,
                message = self.reader.next() => message,
            };

            let (header, payload_size) = match message {
                Some(Ok(Message::Header(head))) => head,
                Some(Ok(Message::Payload(_))) => {
                    error!("received payload while expecting a response head");
                    self.state.set_read_error(ParseError::invalid_body("received payload while expecting a response head").into());
                    return Stopped::Failed;
                }
                Some(Err(e)) => {
                    error!(cause = %e, "failed to read response");
                    self.state.set_read_error(e.into());
                    return Stopped::Failed;
                }
                None => {
                    info!("server closed connection before sending a response");
                    self.state.set_read_error(ClientError::ServerClosed);
                    return Stopped::Failed;
                }
            };

            debug!(method = %request.method, status = %header.status(), ?payload_size, "received response");

            if is_last_exchange(&request, &header, payload_size) {
                debug!("connection closes after this exchange");
                alive = false;
                self.state.set_read_error(ClientError::ServerClosed);
            }

            if payload_size.is_empty() {
                // responses without a body are not handed out
                debug!(status = %header.status(), "skip publishing bodyless response");
                continue;
            }

            match self.drain(header, payload_size).await {
                Drained::Clean => {}
                Drained::Abandoned => {
                    info!("response body closed before its end, data left in buffer");
                    return Stopped::Abandoned;
                }
                Drained::Stopped(stopped) => return stopped,
            }
        }

        Stopped::LastExchange
    }

    /// Publishes a response and serves its body until the caller finished with it.
    async fn drain(&mut self, header: ResponseHeader, payload_size: PayloadSize) -> Drained {
        let Self { reader, state, responses, teardown, .. } = self;

        let (drain_tx, mut drain_rx) = mpsc::channel::<bool>(2);
        let early_close_tx = drain_tx.clone();
        let early_close_state = Arc::clone(state);
        let eof_state = Arc::clone(state);

        // the outcome is recorded right away, so a caller done with the body
        // can write the next request before this loop wakes up
        let (body, mut body_sender) = ResponseBody::body_channel(reader, payload_size);
        let body = DrainSignal::new(body)
            .on_early_close(move || {
                early_close_state.finish_body(false);
                let _ = early_close_tx.try_send(false);
            })
            .on_eof(move |clean| {
                eof_state.finish_body(clean);
                let _ = drain_tx.try_send(clean);
            });

        state.set_body_reading(true);
        select! {
            biased;
            () = teardown.cancelled() => {
                state.set_body_reading(false);
                return Drained::Stopped(Stopped::Teardown);
            }
            published = responses.send(header.body(body)) => {
                if published.is_err() {
                    state.set_body_reading(false);
                    return Drained::Stopped(Stopped::Released);
                }
            }
        }

        let pump = body_sender.send_body();
        tokio::pin!(pump);
        let mut pumping = true;

        let clean = loop {
            select! {
                biased;
                () = teardown.cancelled() => {
                    state.set_body_reading(false);
                    return Drained::Stopped(Stopped::Teardown);
                }
                outcome = drain_rx.recv() => break outcome.unwrap_or(false),
                served = &mut pump, if pumping => {
                    pumping = false;
                    if let Err(e) = served {
                        debug!(cause = %e, "stop serving response body");
                    }
                }
            }
        };

        state.finish_body(clean);
        if clean { Drained::Clean } else { Drained::Abandoned }
    }
}

enum Drained {
    Clean,
    Abandoned,
    Stopped(Stopped),
}

/// An exchange is the last one when either side announced the connection
/// closes, the body runs until the connection closes, or the response is a
/// non-final informational one.
fn is_last_exchange(request: &InFlightRequest, header: &ResponseHeader, payload_size: PayloadSize) -> bool {
    request.wants_close || header.wants_close() || payload_size.is_until_close() || header.is_informational()
}
