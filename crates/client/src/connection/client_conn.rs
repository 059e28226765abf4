use std::fmt;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use http::{Request, Response};
use http_body::Body;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::select;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::connection::Builder;
use crate::connection::message_reader::MessageReader;
use crate::connection::message_writer::MessageWriter;
use crate::connection::read_loop::{InFlightRequest, ReadLoop};
use crate::connection::state::SharedState;
use crate::protocol::body::IncomingBody;
use crate::protocol::{ClientError, RequestForm, SendError};

/// A persistent HTTP/1.1 connection seen from the client side.
///
/// `ClientConn` writes requests onto an established transport and hands out
/// the responses in the order the requests were written. Only one exchange is
/// in flight at a time: a new request is refused until the body of the
/// previous response was read to its end or dropped.
///
/// A background task started on construction reads the responses. Once the
/// connection can't be used any more (the server closed it, a response was
/// malformed, a body was abandoned, a read was canceled, ...) every operation
/// fails with the same sticky error, and the connection should be discarded.
///
/// Requests may carry a [`CancellationToken`] in their extensions. Cancelling
/// it while [`send_request`](Self::send_request) waits for the response makes
/// the call return [`ClientError::Canceled`] and poisons the connection.
///
/// Concurrent calls to [`write`](Self::write) are not ordered against each
/// other; drive one connection from one caller at a time.
///
/// # Example
///
/// ```no_run
/// use http::Request;
/// use http_body_util::{BodyExt, Empty};
/// use bytes::Bytes;
/// use micro_client::connection::ClientConn;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let stream = tokio::net::TcpStream::connect("127.0.0.1:8080").await?;
/// let conn = ClientConn::new(stream);
///
/// let request = Request::get("http://127.0.0.1:8080/").body(Empty::<Bytes>::new())?;
/// let response = conn.send_request(request).await?;
/// let body = response.into_body().collect().await?.to_bytes();
/// # Ok(())
/// # }
/// ```
pub struct ClientConn<T> {
    state: Arc<SharedState>,
    writer: Mutex<Option<MessageWriter<WriteHalf<T>>>>,
    requests: mpsc::Sender<InFlightRequest>,
    responses: Mutex<mpsc::Receiver<Response<IncomingBody>>>,
    read_loop: Mutex<Option<JoinHandle<MessageReader<ReadHalf<T>>>>>,
    teardown: CancellationToken,
    read_timeout: Option<Duration>,
}

impl<T> ClientConn<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Creates a connection over an established transport.
    ///
    /// Must be called within a Tokio runtime, the read loop is spawned right away.
    pub fn new(io: T) -> Self {
        Builder::new().build(io)
    }

    /// Creates a connection that continues from bytes already read off `io`.
    pub fn with_buffer(io: T, buffered: BytesMut) -> Self {
        Builder::new().build_with_buffer(io, buffered)
    }

    /// Creates a connection to a forward proxy, writing absolute-form request targets.
    pub fn proxy(io: T) -> Self {
        Builder::new().request_form(RequestForm::Absolute).build(io)
    }

    pub(crate) fn from_builder(builder: &Builder, io: T, buffered: BytesMut) -> Self {
        let (read_half, write_half) = tokio::io::split(io);

        let state = Arc::new(SharedState::new());
        let teardown = CancellationToken::new();
        let (requests, requests_rx) = mpsc::channel(1);
        let (responses_tx, responses) = mpsc::channel(1);

        let reader = MessageReader::new(read_half, buffered, builder.read_buffer_size);
        let read_loop = ReadLoop::new(reader, Arc::clone(&state), requests_rx, responses_tx, teardown.clone());
        let read_loop = tokio::spawn(read_loop.run());

        let writer = MessageWriter::with_capacity(write_half, builder.request_form, builder.write_buffer_size);

        Self {
            state,
            writer: Mutex::new(Some(writer)),
            requests,
            responses: Mutex::new(responses),
            read_loop: Mutex::new(Some(read_loop)),
            teardown,
            read_timeout: builder.read_timeout,
        }
    }

    /// Checks whether the connection can carry another exchange.
    ///
    /// # Errors
    ///
    /// Returns the sticky read error if set, otherwise the sticky write error if
    /// set, otherwise [`ClientError::Closed`] once the transport was hijacked.
    pub fn ping(&self) -> Result<(), ClientError> {
        self.state.ping()
    }

    /// Returns true while the body of the last response is still being read.
    pub fn is_body_reading(&self) -> bool {
        self.state.is_body_reading()
    }

    /// Sends a request and waits for its response.
    ///
    /// The wait is canceled by a [`CancellationToken`] found in the request's
    /// extensions, or by the configured read timeout.
    ///
    /// # Errors
    ///
    /// Fails with the first error of [`write`](Self::write) or [`read`](Self::read).
    pub async fn send_request<B>(&self, request: Request<B>) -> Result<Response<IncomingBody>, ClientError>
    where
        B: Body + Unpin,
        B::Error: Display,
    {
        let cancel = request.extensions().get::<CancellationToken>().cloned().unwrap_or_default();
        self.write(request).await?;
        self.read(&cancel).await
    }

    /// Writes a request onto the connection.
    ///
    /// # Errors
    ///
    /// - the sticky error of a connection that is no longer usable
    /// - [`ClientError::BodyStillPending`] while the previous response body is being read
    /// - the send error if the request could not be written, which also poisons
    ///   the write side of the connection
    ///
    /// A request asking to close the connection is written, but makes every
    /// later write fail with [`ClientError::FinalRequest`].
    pub async fn write<B>(&self, request: Request<B>) -> Result<(), ClientError>
    where
        B: Body + Unpin,
        B::Error: Display,
    {
        self.ping()?;
        if self.state.is_body_reading() {
            return Err(ClientError::BodyStillPending);
        }

        let in_flight = InFlightRequest {
            method: request.method().clone(),
            wants_close: crate::protocol::wants_close(request.version(), request.headers()),
        };
        if in_flight.wants_close {
            self.state.set_write_error(ClientError::FinalRequest);
        }

        {
            let mut writer = self.writer.lock().await;
            let Some(writer) = writer.as_mut() else {
                return Err(ClientError::Closed);
            };

            if let Err(e) = writer.send_request(request).await {
                error!(cause = %e, "failed to write request");
                let e = ClientError::from(e);
                self.state.set_write_error(e.clone());
                return Err(e);
            }
        }

        debug!(method = %in_flight.method, "request written");
        if self.requests.send(in_flight).await.is_err() {
            return Err(self.stopped_error());
        }
        Ok(())
    }

    /// Waits for the response to the last written request.
    ///
    /// # Errors
    ///
    /// If `cancel` fires, or the read timeout elapses, first, the cancellation
    /// is recorded as the connection's read error and returned. If the read
    /// loop already stopped, the connection's sticky error is returned.
    pub async fn read(&self, cancel: &CancellationToken) -> Result<Response<IncomingBody>, ClientError> {
        let mut responses = self.responses.lock().await;

        let timeout = async {
            match self.read_timeout {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };

        select! {
            biased;
            response = responses.recv() => match response {
                Some(response) => Ok(response),
                None => Err(self.stopped_error()),
            },
            () = cancel.cancelled() => {
                info!("read canceled, connection is no longer usable");
                self.state.set_read_error(ClientError::Canceled);
                Err(ClientError::Canceled)
            }
            () = timeout => {
                info!(timeout = ?self.read_timeout, "read timed out, connection is no longer usable");
                self.state.set_read_error(ClientError::TimedOut);
                Err(ClientError::TimedOut)
            }
        }
    }

    /// The error reported once the read loop is gone.
    fn stopped_error(&self) -> ClientError {
        self.state.ping().err().unwrap_or(ClientError::ServerClosed)
    }

    /// Takes the transport away from the connection.
    ///
    /// Stops the read loop and returns the transport together with any bytes
    /// read from it but not consumed yet. Later calls return `None`, and the
    /// connection reports [`ClientError::Closed`] from then on.
    pub async fn hijack(&self) -> Option<(T, BytesMut)> {
        if !self.state.detach() {
            return None;
        }

        let writer = self.writer.lock().await.take();
        self.teardown.cancel();
        let read_loop = self.read_loop.lock().await.take();

        let reader = match read_loop?.await {
            Ok(reader) => reader,
            Err(e) => {
                error!(cause = %e, "read loop failed, transport is lost");
                return None;
            }
        };

        let (read_half, buffered) = reader.into_parts();
        info!(buffered = buffered.len(), "connection hijacked");
        Some((read_half.unsplit(writer?.into_inner()), buffered))
    }

    /// Alias of [`hijack`](Self::hijack).
    pub async fn detach(&self) -> Option<(T, BytesMut)> {
        self.hijack().await
    }

    /// Closes the connection.
    ///
    /// Shuts the transport down if it is still owned by the connection,
    /// otherwise only stops the read loop.
    ///
    /// # Errors
    ///
    /// Returns an error if shutting the transport down failed.
    pub async fn close(&self) -> Result<(), ClientError> {
        match self.hijack().await {
            Some((mut io, _)) => {
                io.shutdown().await.map_err(SendError::io)?;
                Ok(())
            }
            None => {
                self.teardown.cancel();
                Ok(())
            }
        }
    }
}

impl<T> Drop for ClientConn<T> {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}

impl<T> fmt::Debug for ClientConn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConn")
            .field("state", &self.state)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}
