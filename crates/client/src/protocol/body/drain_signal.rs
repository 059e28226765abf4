//! A body decorator that reports how its body ended.
//!
//! A persistent connection can only carry the next exchange once the current
//! response body has been read to its end. [`DrainSignal`] wraps a body and
//! reports, exactly once, whether that happened:
//!
//! - the wrapped body yields its last frame (`poll_frame` returns `None`):
//!   the end-of-stream callback receives `true`
//! - the wrapped body yields an error: the end-of-stream callback receives `false`
//! - the wrapper is closed or dropped before either: the early-close callback runs

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use http_body::{Body, Frame, SizeHint};

type EarlyCloseFn = Box<dyn FnOnce() + Send>;
type EofFn = Box<dyn FnOnce(bool) + Send>;

/// Wraps a body and signals whether it was drained or abandoned.
pub struct DrainSignal<B> {
    body: B,
    reported: bool,
    on_early_close: Option<EarlyCloseFn>,
    on_eof: Option<EofFn>,
}

impl<B> DrainSignal<B> {
    pub fn new(body: B) -> Self {
        Self { body, reported: false, on_early_close: None, on_eof: None }
    }

    /// Registers the callback run when the body is closed before reaching its end.
    #[must_use]
    pub fn on_early_close<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_early_close = Some(Box::new(f));
        self
    }

    /// Registers the callback run when the body reaches a terminal frame.
    ///
    /// The argument is `true` when the body ended cleanly and `false` when it failed.
    #[must_use]
    pub fn on_eof<F>(mut self, f: F) -> Self
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.on_eof = Some(Box::new(f));
        self
    }

    /// Returns true once an outcome has been reported.
    pub fn is_reported(&self) -> bool {
        self.reported
    }

    pub fn get_ref(&self) -> &B {
        &self.body
    }

    /// Closes the body, reporting an early close if it had not ended yet.
    pub fn close(self) {
        drop(self);
    }

    fn report_eof(&mut self, clean: bool) {
        if self.reported {
            return;
        }
        self.reported = true;
        self.on_early_close.take();
        if let Some(f) = self.on_eof.take() {
            f(clean);
        }
    }

    fn report_early_close(&mut self) {
        if self.reported {
            return;
        }
        self.reported = true;
        self.on_eof.take();
        if let Some(f) = self.on_early_close.take() {
            f();
        }
    }
}

impl<B> Body for DrainSignal<B>
where
    B: Body + Unpin,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let frame = ready!(Pin::new(&mut this.body).poll_frame(cx));

        match &frame {
            None => this.report_eof(true),
            Some(Err(_)) => this.report_eof(false),
            Some(Ok(_)) => {}
        }

        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.body.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.body.size_hint()
    }
}

impl<B> Drop for DrainSignal<B> {
    fn drop(&mut self) {
        self.report_early_close();
    }
}

impl<B: fmt::Debug> fmt::Debug for DrainSignal<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrainSignal").field("body", &self.body).field("reported", &self.reported).finish_non_exhaustive()
    }
}
