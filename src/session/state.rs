//! Session lifecycle state.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle of one streaming exchange.
///
/// `Idle -> Sending -> Reading -> {Closed | Aborted | Errored}`. The three
/// terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Created, read loop not started yet.
    Idle = 0,
    /// Request frame is being sent, waiting for the response head.
    Sending = 1,
    /// Response body is being read.
    Reading = 2,
    /// Server finished the stream cleanly.
    Closed = 3,
    /// Cancelled by the owner.
    Aborted = 4,
    /// Terminated by a transport or fatal decode error.
    Errored = 5,
}

impl SessionState {
    /// Whether no further transitions are possible.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Closed | SessionState::Aborted | SessionState::Errored
        )
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SessionState::Idle,
            1 => SessionState::Sending,
            2 => SessionState::Reading,
            3 => SessionState::Closed,
            4 => SessionState::Aborted,
            _ => SessionState::Errored,
        }
    }
}

/// Shared, lock-free cell holding a [`SessionState`].
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(SessionState::Idle as u8)))
    }

    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` unless the current state is terminal.
    ///
    /// Returns `true` if this call performed the transition.
    pub(crate) fn advance(&self, next: SessionState) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if SessionState::from_u8(current).is_terminal() {
                return false;
            }
            match self.0.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}
