//! Streaming session - one request frame out, a stream of frames back.
//!
//! A [`Session`] owns one exchange end to end:
//! 1. Encode the request into a single frame
//! 2. Open the transport and send it
//! 3. Read chunks, feed them through the [`FrameBuffer`], dispatch payloads
//! 4. Stop on end-of-stream, cancellation or a terminal error
//!
//! There is exactly one read loop per session and the frame handler is only
//! ever called from it, in arrival order. Once [`Session::cancel`] has taken
//! effect neither the frame handler nor the error handler runs again.
//!
//! The protocol has no idle timeout. A caller that wants one races the session
//! against a timer, which is what [`Session::cancel_after`] does.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cityfeed_client::session::Session;
//! use cityfeed_client::transport::{Endpoint, HttpTransport};
//! use serde_json::json;
//!
//! # async fn run() {
//! let transport = Arc::new(HttpTransport::new("http://localhost:8080"));
//! let endpoint = Endpoint::new("summary.v1.SummaryService", "StreamSummary");
//!
//! let mut session = Session::builder(transport, endpoint)
//!     .on_error(|err| eprintln!("stream failed: {}", err))
//!     .open(&json!({ "lat": 12.97, "long": 77.64, "areas": ["Indiranagar"] }), |payload| {
//!         println!("{}", payload);
//!     });
//!
//! session.join().await;
//! # }
//! ```

mod state;
mod stream;

pub use state::SessionState;
pub use stream::SessionStream;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{FeedError, Result};
use crate::protocol::{encode_frame, FrameBuffer, Message, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::transport::{Endpoint, Transport};
use state::StateCell;

/// Callback invoked once per decoded payload.
pub type FrameHandler = Box<dyn FnMut(Value) + Send + 'static>;

/// Callback invoked at most once with the terminal error.
pub type ErrorHandler = Box<dyn FnOnce(FeedError) + Send + 'static>;

/// Callback invoked at most once when the server ends the stream cleanly.
pub type CloseHandler = Box<dyn FnOnce() + Send + 'static>;

/// Builder for configuring and opening a [`Session`].
pub struct SessionBuilder {
    transport: Arc<dyn Transport>,
    endpoint: Endpoint,
    max_payload_size: u32,
    on_error: Option<ErrorHandler>,
    on_close: Option<CloseHandler>,
}

impl SessionBuilder {
    /// Create a builder for `endpoint` over `transport`.
    pub fn new(transport: Arc<dyn Transport>, endpoint: Endpoint) -> Self {
        Self {
            transport,
            endpoint,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            on_error: None,
            on_close: None,
        }
    }

    /// Set the largest payload a single frame may declare.
    ///
    /// Default: 16 MiB
    pub fn max_payload_size(mut self, limit: u32) -> Self {
        self.max_payload_size = limit;
        self
    }

    /// Set the handler for the terminal error.
    ///
    /// Without one, terminal errors are logged at `error` level.
    pub fn on_error<E>(mut self, handler: E) -> Self
    where
        E: FnOnce(FeedError) + Send + 'static,
    {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Set the handler for a clean end of stream.
    ///
    /// Not called on cancellation or error.
    pub fn on_close<C>(mut self, handler: C) -> Self
    where
        C: FnOnce() + Send + 'static,
    {
        self.on_close = Some(Box::new(handler));
        self
    }

    /// Encode `request`, open the exchange and start the read loop.
    ///
    /// Never fails synchronously: an unserializable request is reported to
    /// the error handler like any other terminal error.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open<T, F>(self, request: &T, on_frame: F) -> Session
    where
        T: Serialize + ?Sized,
        F: FnMut(Value) + Send + 'static,
    {
        let body = encode_frame(request);
        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        let state = StateCell::new();

        tracing::debug!("Opening session for {}", self.endpoint);

        let task = tokio::spawn(run(
            ReadLoop {
                transport: self.transport,
                endpoint: self.endpoint.clone(),
                max_payload_size: self.max_payload_size,
                cancel: cancel.clone(),
                state: state.clone(),
            },
            body,
            Handlers {
                on_frame: Box::new(on_frame),
                on_error: self.on_error,
                on_close: self.on_close,
            },
            done.clone(),
        ));

        Session {
            endpoint: self.endpoint,
            cancel,
            done,
            state,
            task: Some(task),
        }
    }
}

/// Handle to one running streaming exchange.
///
/// Dropping the handle cancels the session.
pub struct Session {
    endpoint: Endpoint,
    cancel: CancellationToken,
    /// Cancelled when the read loop exits.
    done: CancellationToken,
    state: StateCell,
    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Create a session builder.
    pub fn builder(transport: Arc<dyn Transport>, endpoint: Endpoint) -> SessionBuilder {
        SessionBuilder::new(transport, endpoint)
    }

    /// Open a session without an error handler.
    pub fn open<T, F>(
        transport: Arc<dyn Transport>,
        endpoint: Endpoint,
        request: &T,
        on_frame: F,
    ) -> Session
    where
        T: Serialize + ?Sized,
        F: FnMut(Value) + Send + 'static,
    {
        SessionBuilder::new(transport, endpoint).open(request, on_frame)
    }

    /// Cancel the exchange.
    ///
    /// Idempotent. The in-flight request is aborted and the read loop stops at
    /// its next suspension point. Once the loop observes cancellation no
    /// further handler is invoked; a frame handler already running on another
    /// worker thread finishes its current call.
    pub fn cancel(&self) {
        self.cancel.cancel();
        if self.state.advance(SessionState::Aborted) {
            tracing::debug!("Session for {} cancelled", self.endpoint);
        }
    }

    /// Cancel the session if it is still running after `timeout`.
    pub fn cancel_after(&self, timeout: Duration) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        let done = self.done.clone();
        let state = self.state.clone();
        let endpoint = self.endpoint.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = done.cancelled() => {}
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    cancel.cancel();
                    if state.advance(SessionState::Aborted) {
                        tracing::debug!("Session for {} timed out after {:?}", endpoint, timeout);
                    }
                }
            }
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Whether the session has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.state.get().is_terminal()
    }

    /// Whether [`cancel`](Self::cancel) has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The endpoint this session talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Wait for the read loop to exit.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.as_mut() {
            if let Err(e) = task.await {
                tracing::error!("Session task for {} failed: {}", self.endpoint, e);
            }
            self.task = None;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.state.advance(SessionState::Aborted);
    }
}

/// Everything the read loop needs besides the handlers.
struct ReadLoop {
    transport: Arc<dyn Transport>,
    endpoint: Endpoint,
    max_payload_size: u32,
    cancel: CancellationToken,
    state: StateCell,
}

struct Handlers {
    on_frame: FrameHandler,
    on_error: Option<ErrorHandler>,
    on_close: Option<CloseHandler>,
}

/// Session task body: drive the read loop, then settle the final state.
async fn run(read_loop: ReadLoop, body: Result<Bytes>, handlers: Handlers, done: CancellationToken) {
    let _done = done.drop_guard();
    let cancel = read_loop.cancel.clone();
    let Handlers {
        mut on_frame,
        on_error,
        on_close,
    } = handlers;

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = read_loop.drive(body, &mut on_frame) => Some(result),
    };

    let endpoint = &read_loop.endpoint;
    let state = &read_loop.state;

    match outcome {
        None => {
            state.advance(SessionState::Aborted);
            tracing::debug!("Read loop for {} stopped by cancellation", endpoint);
        }
        Some(Ok(())) => {
            if cancel.is_cancelled() || !state.advance(SessionState::Closed) {
                return;
            }
            tracing::debug!("Stream for {} closed", endpoint);
            if let Some(handler) = on_close {
                handler();
            }
        }
        Some(Err(e)) => {
            // Cancellation always wins over a racing error.
            if cancel.is_cancelled() || !state.advance(SessionState::Errored) {
                tracing::debug!("Suppressed error after cancellation on {}: {}", endpoint, e);
                return;
            }
            match on_error {
                Some(handler) => handler(e),
                None => tracing::error!("Stream error on {}: {}", endpoint, e),
            }
        }
    }
}

impl ReadLoop {
    async fn drive(&self, body: Result<Bytes>, on_frame: &mut FrameHandler) -> Result<()> {
        let body = body?;

        self.state.advance(SessionState::Sending);
        let mut chunks = self.transport.open(&self.endpoint, body).await?;
        self.state.advance(SessionState::Reading);

        let mut buffer = FrameBuffer::with_max_payload(self.max_payload_size);

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            tracing::trace!("Received {} bytes from {}", chunk.len(), self.endpoint);

            for frame in buffer.push(&chunk)? {
                if self.cancel.is_cancelled() {
                    return Ok(());
                }
                match frame {
                    Ok(Message::Data(payload)) => on_frame(payload),
                    Ok(Message::EndStream(trailer)) => return end_of_stream(&trailer),
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => tracing::warn!("Invalid JSON frame from {}: {}", self.endpoint, e),
                }
            }
            buffer.validate_pending()?;
        }

        if !buffer.is_empty() {
            tracing::debug!(
                "Stream for {} ended with {} bytes of an incomplete frame",
                self.endpoint,
                buffer.len()
            );
        }
        Ok(())
    }
}

/// Interpret the end-of-stream trailer.
fn end_of_stream(trailer: &Value) -> Result<()> {
    match trailer.get("error") {
        Some(error) if !error.is_null() => Err(FeedError::Remote {
            code: error
                .get("code")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport for driving sessions from tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use bytes::Bytes;
    use futures::future::BoxFuture;
    use futures::StreamExt;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    use crate::error::{FeedError, Result};
    use crate::transport::{ChunkStream, Endpoint, Transport};

    pub(crate) type BodySender = mpsc::UnboundedSender<Result<Bytes>>;

    /// Transport whose response bodies are fed by the test through channels.
    ///
    /// Each `open` consumes the oldest queued body.
    pub(crate) struct ChannelTransport {
        bodies: Mutex<VecDeque<mpsc::UnboundedReceiver<Result<Bytes>>>>,
        open_error: Mutex<Option<FeedError>>,
        pub(crate) requests: Mutex<Vec<(Endpoint, Bytes)>>,
    }

    impl ChannelTransport {
        pub(crate) fn new() -> (Self, BodySender) {
            let transport = Self::empty();
            let body = transport.add_body();
            (transport, body)
        }

        pub(crate) fn empty() -> Self {
            Self {
                bodies: Mutex::new(VecDeque::new()),
                open_error: Mutex::new(None),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(err: FeedError) -> Self {
            let transport = Self::empty();
            *transport.open_error.lock().unwrap() = Some(err);
            transport
        }

        /// Queue another response body for the next `open`.
        pub(crate) fn add_body(&self) -> BodySender {
            let (tx, rx) = mpsc::unbounded_channel();
            self.bodies.lock().unwrap().push_back(rx);
            tx
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl Transport for ChannelTransport {
        fn open(&self, endpoint: &Endpoint, body: Bytes) -> BoxFuture<'static, Result<ChunkStream>> {
            self.requests.lock().unwrap().push((endpoint.clone(), body));

            let result = match self.open_error.lock().unwrap().take() {
                Some(err) => Err(err),
                None => match self.bodies.lock().unwrap().pop_front() {
                    Some(rx) => Ok(UnboundedReceiverStream::new(rx).boxed()),
                    None => Err(FeedError::Transport("no response body queued".into())),
                },
            };
            Box::pin(async move { result })
        }
    }
}
