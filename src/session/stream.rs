//! Pull-based view of a session.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{Session, SessionBuilder, SessionState};
use crate::error::{FeedError, Result};
use crate::transport::{Endpoint, Transport};

/// A session exposed as a `Stream` of payloads.
///
/// Yields `Ok(payload)` per decoded frame, then at most one `Err` carrying the
/// terminal error, then ends. Dropping the stream cancels the session.
pub struct SessionStream {
    items: mpsc::UnboundedReceiver<Result<Value>>,
    session: Session,
}

impl SessionStream {
    /// Open `endpoint` and stream its payloads.
    pub fn open<T>(transport: Arc<dyn Transport>, endpoint: Endpoint, request: &T) -> Self
    where
        T: Serialize + ?Sized,
    {
        Self::from_builder(SessionBuilder::new(transport, endpoint), request)
    }

    /// Open a session configured by `builder`.
    ///
    /// Any error handler already set on the builder is replaced.
    pub fn from_builder<T>(builder: SessionBuilder, request: &T) -> Self
    where
        T: Serialize + ?Sized,
    {
        let (tx, items) = mpsc::unbounded_channel();
        let errors = tx.clone();

        let session = builder
            .on_error(move |err: FeedError| {
                let _ = errors.send(Err(err));
            })
            .open(request, move |payload| {
                let _ = tx.send(Ok(payload));
            });

        Self { items, session }
    }

    /// Cancel the underlying session. Buffered payloads are discarded.
    pub fn cancel(&mut self) {
        self.session.cancel();
        self.items.close();
        while self.items.try_recv().is_ok() {}
    }

    /// Lifecycle state of the underlying session.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Borrow the underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl Stream for SessionStream {
    type Item = Result<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.session.is_cancelled() {
            return Poll::Ready(None);
        }
        self.items.poll_recv(cx)
    }
}
