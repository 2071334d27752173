//! Client builder and entry points.
//!
//! The [`ClientBuilder`] provides a fluent API for configuring the base URL,
//! payload limit and transport. The [`FeedClient`] is cheap to clone and
//! hands out the three ways of consuming a feed:
//! 1. [`FeedClient::open`] - callback session
//! 2. [`FeedClient::stream`] / [`FeedClient::updates`] - async streams
//! 3. [`FeedClient::subscribe`] - long-lived subscription with snapshots
//!
//! # Example
//!
//! ```no_run
//! use cityfeed_client::{FeedClient, FeedParams, FeedSpec, FeedUpdate};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FeedClient::builder()
//!         .base_url("http://localhost:8080")
//!         .build()?;
//!
//!     let params = FeedParams::at(12.97, 77.64).area("Indiranagar");
//!     let mut updates = client.updates(FeedSpec::summary(), &params)?;
//!
//!     while let Some(update) = updates.next().await {
//!         if let FeedUpdate::Summary(text) = update? {
//!             println!("{}", text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{FeedError, Result};
use crate::feeds::{FeedParams, FeedSpec, FeedUpdates};
use crate::session::{Session, SessionBuilder, SessionStream};
use crate::subscription::Subscription;
use crate::transport::{Endpoint, HttpTransport, Transport};

/// Builder for configuring and creating a [`FeedClient`].
pub struct ClientBuilder {
    config: ClientConfig,
    http_client: Option<reqwest::Client>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a builder starting from `config`.
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            http_client: None,
            transport: None,
        }
    }

    /// Create a builder from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(ClientConfig::from_env()?))
    }

    /// Set the endpoint base URL.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Self {
        self.config = self.config.base_url(url);
        self
    }

    /// Set the maximum frame payload size.
    ///
    /// Default: 16 MiB
    pub fn max_payload_size(mut self, limit: u32) -> Self {
        self.config = self.config.max_payload_size(limit);
        self
    }

    /// Use an existing `reqwest` client (shared pool, custom TLS, proxies).
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Use a custom transport instead of HTTP. The base URL is then unused.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the configuration and build the client.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::InvalidConfig` if the configuration is unusable.
    pub fn build(self) -> Result<FeedClient> {
        self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let client = self.http_client.unwrap_or_default();
                Arc::new(HttpTransport::with_client(client, &self.config.base_url))
            }
        };

        Ok(FeedClient {
            transport,
            config: Arc::new(self.config),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry point for opening feed sessions.
#[derive(Clone)]
pub struct FeedClient {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
}

impl FeedClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Build a client configured from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        ClientBuilder::from_env()?.build()
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Transport in use.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Session builder for `endpoint`, preconfigured with this client's limits.
    pub fn session(&self, endpoint: Endpoint) -> SessionBuilder {
        SessionBuilder::new(self.transport.clone(), endpoint)
            .max_payload_size(self.config.max_payload_size)
    }

    /// Open a callback session.
    pub fn open<T, F>(&self, endpoint: Endpoint, request: &T, on_frame: F) -> Session
    where
        T: Serialize + ?Sized,
        F: FnMut(Value) + Send + 'static,
    {
        self.session(endpoint).open(request, on_frame)
    }

    /// Open a session and consume its payloads as a stream.
    pub fn stream<T>(&self, endpoint: Endpoint, request: &T) -> SessionStream
    where
        T: Serialize + ?Sized,
    {
        SessionStream::from_builder(self.session(endpoint), request)
    }

    /// Open `feed` with `params` and consume typed updates as a stream.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::InvalidConfig` if the feed needs areas and
    /// `params` has none.
    pub fn updates(&self, feed: FeedSpec, params: &FeedParams) -> Result<FeedUpdates> {
        if !feed.accepts(params) {
            return Err(FeedError::InvalidConfig(format!(
                "{} feed requires at least one area",
                feed.kind()
            )));
        }
        let payloads = self.stream(feed.endpoint().clone(), &feed.request_body(params));
        Ok(FeedUpdates::new(payloads, Arc::new(feed)))
    }

    /// Start a long-lived subscription to `feed`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe(&self, feed: FeedSpec, params: FeedParams) -> Subscription {
        Subscription::new(
            self.transport.clone(),
            Arc::new(feed),
            params,
            self.config.max_payload_size,
        )
    }
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::FeedUpdate;
    use crate::protocol::{decode_frames, encode_frame};
    use crate::session::testing::ChannelTransport;
    use futures::StreamExt;
    use serde_json::json;

    #[test]
    fn test_builder_default() {
        let client = ClientBuilder::default().build().unwrap();
        assert_eq!(client.config().base_url, crate::config::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_builder_configuration() {
        let client = FeedClient::builder()
            .base_url("https://feeds.example.org/")
            .max_payload_size(1024)
            .build()
            .unwrap();

        assert_eq!(client.config().base_url, "https://feeds.example.org");
        assert_eq!(client.config().max_payload_size, 1024);
    }

    #[test]
    fn test_builder_rejects_invalid_url() {
        let err = FeedClient::builder().base_url("localhost:8080").build().unwrap_err();
        assert!(matches!(err, FeedError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_updates_requires_areas() {
        let client = FeedClient::builder()
            .transport(Arc::new(ChannelTransport::empty()))
            .build()
            .unwrap();

        let err = client
            .updates(FeedSpec::culture(), &FeedParams::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("culture feed requires at least one area"));
    }

    #[tokio::test]
    async fn test_updates_over_custom_transport() {
        let (transport, body) = ChannelTransport::new();
        let transport = Arc::new(transport);
        let client = FeedClient::builder().transport(transport.clone()).build().unwrap();

        let params = FeedParams::default().area("Malleshwaram");
        let mut updates = client.updates(FeedSpec::culture(), &params).unwrap();

        body.send(Ok(encode_frame(&json!({ "culturalEvents": [{ "title": "Karaga" }] })).unwrap()))
            .unwrap();
        drop(body);

        let update = updates.next().await.unwrap().unwrap();
        assert!(matches!(update, FeedUpdate::CulturalEvents(ref e) if e[0].title == "Karaga"));
        assert!(updates.next().await.is_none());

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].0, *FeedSpec::culture().endpoint());
        let request = decode_frames(&requests[0].1);
        assert_eq!(
            request.frames[0].as_ref().unwrap().value(),
            &json!({ "areas": ["Malleshwaram"] })
        );
    }
}
