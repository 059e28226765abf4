use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::connection::ClientConn;
use crate::protocol::RequestForm;

/// Default capacity of the read buffer
const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Default capacity of the write buffer
const DEFAULT_WRITE_BUFFER_SIZE: usize = 4 * 1024;

/// Configures and creates a [`ClientConn`].
///
/// ```no_run
/// use std::time::Duration;
/// use micro_client::connection::Builder;
/// use micro_client::protocol::RequestForm;
///
/// # async fn run() -> std::io::Result<()> {
/// let stream = tokio::net::TcpStream::connect("127.0.0.1:3128").await?;
/// let conn = Builder::new()
///     .request_form(RequestForm::Absolute)
///     .read_timeout(Duration::from_secs(30))
///     .build(stream);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    pub(crate) request_form: RequestForm,
    pub(crate) read_buffer_size: usize,
    pub(crate) write_buffer_size: usize,
    pub(crate) read_timeout: Option<Duration>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            request_form: RequestForm::Origin,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            read_timeout: None,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how request targets are written, origin form by default.
    pub fn request_form(&mut self, form: RequestForm) -> &mut Self {
        self.request_form = form;
        self
    }

    pub fn read_buffer_size(&mut self, size: usize) -> &mut Self {
        self.read_buffer_size = size.max(1);
        self
    }

    pub fn write_buffer_size(&mut self, size: usize) -> &mut Self {
        self.write_buffer_size = size;
        self
    }

    /// Gives up waiting for a response after `timeout`.
    ///
    /// A timed out read poisons the connection like a canceled one.
    pub fn read_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Creates the connection and spawns its read loop.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build<T>(&self, io: T) -> ClientConn<T>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        self.build_with_buffer(io, BytesMut::new())
    }

    /// Like [`build`](Self::build), for a transport some bytes were already read from.
    pub fn build_with_buffer<T>(&self, io: T, buffered: BytesMut) -> ClientConn<T>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        ClientConn::from_builder(self, io, buffered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let builder = Builder::new();
        assert_eq!(builder.request_form, RequestForm::Origin);
        assert_eq!(builder.read_buffer_size, DEFAULT_READ_BUFFER_SIZE);
        assert_eq!(builder.write_buffer_size, DEFAULT_WRITE_BUFFER_SIZE);
        assert_eq!(builder.read_timeout, None);
    }

    #[test]
    fn setters_chain() {
        let mut builder = Builder::new();
        builder.request_form(RequestForm::Absolute).read_buffer_size(0).read_timeout(Duration::from_millis(5));

        assert_eq!(builder.request_form, RequestForm::Absolute);
        assert_eq!(builder.read_buffer_size, 1);
        assert_eq!(builder.read_timeout, Some(Duration::from_millis(5)));
    }
}
