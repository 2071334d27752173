//! Long-lived feed subscription with observable state.
//!
//! A [`Subscription`] keeps at most one session open for one feed. Changing
//! its parameters cancels the running session before the next one opens, and
//! the typed records of every session are folded into one [`FeedSnapshot`]
//! that callers observe through a `tokio::sync::watch` channel.
//!
//! # Example
//!
//! ```no_run
//! use cityfeed_client::{FeedClient, FeedParams, FeedSpec};
//!
//! # async fn run() -> cityfeed_client::Result<()> {
//! let client = FeedClient::from_env()?;
//! let mut culture = client.subscribe(FeedSpec::culture(), FeedParams::default());
//! let mut snapshots = culture.watch();
//!
//! // No areas yet: the feed stays idle.
//! culture.update(FeedParams::default().area("Indiranagar"));
//!
//! while snapshots.changed().await.is_ok() {
//!     let snapshot = snapshots.borrow_and_update();
//!     println!("{} events", snapshot.collections.cultural_events.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::FeedError;
use crate::feeds::{FeedCollections, FeedParams, FeedSpec};
use crate::session::{Session, SessionBuilder};
use crate::transport::Transport;

/// Connection status of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedStatus {
    /// No session open (parameters missing or subscription stopped).
    #[default]
    Idle,
    /// Session opened, no frame received yet.
    Connecting,
    /// At least one frame received.
    Streaming,
    /// Server ended the stream.
    Closed,
    /// Session terminated with an error.
    Failed(String),
}

/// Point-in-time view of a subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    /// Connection status.
    pub status: FeedStatus,
    /// Frames received by the current session.
    pub frames_received: u64,
    /// Records accumulated across sessions.
    pub collections: FeedCollections,
}

/// Consumer-facing handle for one feed.
///
/// Dropping the subscription cancels its session.
pub struct Subscription {
    transport: Arc<dyn Transport>,
    spec: Arc<FeedSpec>,
    max_payload_size: u32,
    params: FeedParams,
    session: Option<Session>,
    /// Bumped whenever a session is superseded; stale handlers compare and bail.
    generation: Arc<AtomicU64>,
    snapshot: Arc<watch::Sender<FeedSnapshot>>,
}

impl Subscription {
    /// Create a subscription and open its first session if `params` allow it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        transport: Arc<dyn Transport>,
        spec: Arc<FeedSpec>,
        params: FeedParams,
        max_payload_size: u32,
    ) -> Self {
        let (snapshot, _) = watch::channel(FeedSnapshot::default());
        let mut subscription = Self {
            transport,
            spec,
            max_payload_size,
            params,
            session: None,
            generation: Arc::new(AtomicU64::new(0)),
            snapshot: Arc::new(snapshot),
        };
        subscription.restart();
        subscription
    }

    /// Change the parameters.
    ///
    /// Equal parameters are a no-op. Otherwise the running session is
    /// cancelled before a new one is opened.
    pub fn update(&mut self, params: FeedParams) {
        if params == self.params {
            tracing::trace!("Parameters for {} feed unchanged", self.spec.kind());
            return;
        }
        self.params = params;
        self.restart();
    }

    /// Cancel the running session and open a fresh one with the current
    /// parameters.
    pub fn restart(&mut self) {
        self.stop_session();

        if !self.spec.accepts(&self.params) {
            tracing::warn!(
                "Not opening {} feed: at least one area is required",
                self.spec.kind()
            );
            self.set_status(FeedStatus::Idle);
            return;
        }

        let generation = self.generation.load(Ordering::Acquire);
        self.snapshot.send_modify(|s| {
            s.status = FeedStatus::Connecting;
            s.frames_received = 0;
        });

        let request = self.spec.request_body(&self.params);
        let builder = SessionBuilder::new(self.transport.clone(), self.spec.endpoint().clone())
            .max_payload_size(self.max_payload_size);

        let sink = SessionSink {
            snapshot: self.snapshot.clone(),
            current: self.generation.clone(),
            generation,
        };

        let on_error = {
            let sink = sink.clone();
            move |err: FeedError| sink.fail(err)
        };

        let on_close = {
            let sink = sink.clone();
            move || {
                sink.publish(|s| s.status = FeedStatus::Closed);
            }
        };

        let on_frame = {
            let spec = self.spec.clone();
            move |payload: serde_json::Value| {
                let updates = spec.resolve(&payload);
                sink.publish(|s| {
                    s.status = FeedStatus::Streaming;
                    s.frames_received += 1;
                    for update in updates {
                        s.collections.apply(update);
                    }
                });
            }
        };

        tracing::debug!("Subscribing to {} feed", self.spec.kind());
        self.session = Some(
            builder
                .on_error(on_error)
                .on_close(on_close)
                .open(&request, on_frame),
        );
    }

    /// Cancel the running session, if any. Collected records are kept.
    pub fn stop(&mut self) {
        self.stop_session();
        self.set_status(FeedStatus::Idle);
    }

    /// Empty the accumulated collections.
    pub fn clear(&mut self) {
        self.snapshot.send_modify(|s| s.collections.clear());
    }

    /// Observe snapshots as they change.
    pub fn watch(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshot.subscribe()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Current parameters.
    pub fn params(&self) -> &FeedParams {
        &self.params
    }

    /// Feed this subscription follows.
    pub fn spec(&self) -> &FeedSpec {
        &self.spec
    }

    /// Whether a session is currently running.
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_finished())
    }

    fn stop_session(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(session) = self.session.take() {
            session.cancel();
        }
    }

    fn set_status(&self, status: FeedStatus) {
        self.snapshot.send_if_modified(|s| {
            if s.status == status {
                return false;
            }
            s.status = status;
            true
        });
    }
}

/// Snapshot writer handed to one session's handlers.
#[derive(Clone)]
struct SessionSink {
    snapshot: Arc<watch::Sender<FeedSnapshot>>,
    current: Arc<AtomicU64>,
    /// Generation the session was opened under.
    generation: u64,
}

impl SessionSink {
    /// Apply `modify` unless the session has been superseded.
    fn publish(&self, modify: impl FnOnce(&mut FeedSnapshot)) -> bool {
        self.snapshot.send_if_modified(|s| {
            if self.current.load(Ordering::Acquire) != self.generation {
                return false;
            }
            modify(s);
            true
        })
    }

    fn fail(&self, err: FeedError) {
        let reported = self.publish(|s| {
            tracing::error!("Feed stream error: {}", err);
            s.status = FeedStatus::Failed(err.to_string());
        });
        if !reported {
            tracing::debug!("Dropped error from superseded session: {}", err);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop_session();
    }
}
