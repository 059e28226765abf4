//! The state shared between a [`ClientConn`](super::ClientConn) and its read loop.
//!
//! Every access takes the lock for a field check or update only, no I/O is
//! done while it is held.

use parking_lot::Mutex;
use tracing::debug;

use crate::protocol::ClientError;

#[derive(Debug, Default)]
struct ConnState {
    read_error: Option<ClientError>,
    write_error: Option<ClientError>,
    body_reading: bool,
    detached: bool,
}

#[derive(Debug, Default)]
pub(crate) struct SharedState {
    inner: Mutex<ConnState>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Checks whether the connection can carry another exchange.
    ///
    /// The read error takes precedence over the write error, and a detached
    /// connection reports [`ClientError::Closed`].
    pub(crate) fn ping(&self) -> Result<(), ClientError> {
        let state = self.inner.lock();
        if let Some(e) = &state.read_error {
            return Err(e.clone());
        }
        if let Some(e) = &state.write_error {
            return Err(e.clone());
        }
        if state.detached {
            return Err(ClientError::Closed);
        }
        Ok(())
    }

    /// Records a read error unless one is already set.
    pub(crate) fn set_read_error(&self, error: ClientError) {
        let mut state = self.inner.lock();
        match &state.read_error {
            Some(current) => debug!(%current, ignored = %error, "read error already set"),
            None => state.read_error = Some(error),
        }
    }

    /// Records a write error.
    ///
    /// A failure while sending the final request replaces
    /// [`ClientError::FinalRequest`], so the caller sees what went wrong.
    pub(crate) fn set_write_error(&self, error: ClientError) {
        let mut state = self.inner.lock();
        match &state.write_error {
            None | Some(ClientError::FinalRequest) => state.write_error = Some(error),
            Some(current) => debug!(%current, ignored = %error, "write error already set"),
        }
    }

    pub(crate) fn set_body_reading(&self, flag: bool) {
        self.inner.lock().body_reading = flag;
    }

    /// Records how the body being read ended.
    ///
    /// A body that did not reach its end leaves unread bytes on the wire, so
    /// the connection can't carry another exchange. Only the first report for
    /// a body being read counts, and none once the connection was detached.
    pub(crate) fn finish_body(&self, clean: bool) {
        let mut state = self.inner.lock();
        if !std::mem::replace(&mut state.body_reading, false) || state.detached {
            return;
        }
        if !clean && state.read_error.is_none() {
            state.read_error = Some(ClientError::DataLeftInBuffer);
        }
    }

    pub(crate) fn is_body_reading(&self) -> bool {
        self.inner.lock().body_reading
    }

    /// Marks the connection as detached, returns false if it already was.
    pub(crate) fn detach(&self) -> bool {
        let mut state = self.inner.lock();
        !std::mem::replace(&mut state.detached, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SendError;

    #[test]
    fn live_until_an_error_is_recorded() {
        let state = SharedState::new();
        assert!(state.ping().is_ok());

        state.set_body_reading(true);
        assert!(state.is_body_reading());
        assert!(state.ping().is_ok());
    }

    #[test]
    fn read_error_is_sticky_and_first_wins() {
        let state = SharedState::new();
        state.set_read_error(ClientError::Canceled);
        state.set_read_error(ClientError::ServerClosed);

        for _ in 0..3 {
            assert!(matches!(state.ping(), Err(ClientError::Canceled)));
        }
    }

    #[test]
    fn read_error_wins_over_write_error() {
        let state = SharedState::new();
        state.set_write_error(ClientError::FinalRequest);
        assert!(matches!(state.ping(), Err(ClientError::FinalRequest)));

        state.set_read_error(ClientError::DataLeftInBuffer);
        assert!(matches!(state.ping(), Err(ClientError::DataLeftInBuffer)));
    }

    #[test]
    fn send_failure_replaces_final_request() {
        let state = SharedState::new();
        state.set_write_error(ClientError::FinalRequest);
        state.set_write_error(SendError::MissingHost.into());
        state.set_write_error(ClientError::FinalRequest);

        assert!(matches!(state.ping(), Err(ClientError::Send { .. })));
    }

    #[test]
    fn finished_body() {
        let state = SharedState::new();

        state.set_body_reading(true);
        state.finish_body(true);
        assert!(!state.is_body_reading());
        assert!(state.ping().is_ok());

        state.set_body_reading(true);
        state.finish_body(false);
        assert!(!state.is_body_reading());
        assert!(matches!(state.ping(), Err(ClientError::DataLeftInBuffer)));
    }

    #[test]
    fn abandoned_body_keeps_earlier_error() {
        let state = SharedState::new();
        state.set_read_error(ClientError::ServerClosed);
        state.set_body_reading(true);
        state.finish_body(false);
        assert!(matches!(state.ping(), Err(ClientError::ServerClosed)));
    }

    #[test]
    fn late_body_outcome_is_ignored() {
        let state = SharedState::new();
        state.set_body_reading(true);
        assert!(state.detach());
        state.set_body_reading(false);

        state.finish_body(false);
        assert!(matches!(state.ping(), Err(ClientError::Closed)));
    }

    #[test]
    fn body_outcome_after_detach_is_ignored() {
        let state = SharedState::new();
        state.set_body_reading(true);
        assert!(state.detach());

        state.finish_body(false);
        assert!(!state.is_body_reading());
        assert!(matches!(state.ping(), Err(ClientError::Closed)));
    }

    #[test]
    fn detach_once() {
        let state = SharedState::new();
        assert!(state.detach());
        assert!(!state.detach());
        assert!(matches!(state.ping(), Err(ClientError::Closed)));
    }
}
