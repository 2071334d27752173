//! HTTP transport over `reqwest`.
//!
//! One POST per session. The request body is exactly one frame; the response
//! body is read incrementally via `bytes_stream()`, never buffered in full.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use super::{ChunkStream, Endpoint, Transport};
use crate::error::{FeedError, Result};
use crate::protocol::CONNECT_JSON_CONTENT_TYPE;

/// Connect-JSON transport over HTTP.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Arc<str>,
}

impl HttpTransport {
    /// Create a transport for `base_url` with a default HTTP client.
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a transport reusing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, base_url: impl AsRef<str>) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.as_ref().trim_end_matches('/')),
        }
    }

    /// Base URL requests are sent under.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    fn open(&self, endpoint: &Endpoint, body: Bytes) -> BoxFuture<'static, Result<ChunkStream>> {
        let url = endpoint.url(&self.base_url);
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, CONNECT_JSON_CONTENT_TYPE)
            .header(ACCEPT, CONNECT_JSON_CONTENT_TYPE)
            .body(body);

        Box::pin(async move {
            let response = request.send().await?;

            let status = response.status();
            if !status.is_success() {
                return Err(FeedError::Status {
                    status: status.as_u16(),
                });
            }

            Ok(response.bytes_stream().map_err(FeedError::from).boxed())
        })
    }
}
