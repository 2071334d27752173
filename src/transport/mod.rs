//! Transport module - opening one streaming exchange per session.
//!
//! A [`Transport`] sends the single encoded request frame and hands back the
//! response body as a stream of raw chunks. Chunk boundaries are whatever the
//! network produced; de-framing happens in the session.
//!
//! Dropping the returned future or stream aborts the underlying request.

mod endpoint;
mod http;

pub use endpoint::Endpoint;
pub use http::HttpTransport;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::error::Result;

/// Stream of raw response chunks.
pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// Something that can carry one request frame and stream back the response.
pub trait Transport: Send + Sync + 'static {
    /// Open a streaming exchange, sending `body` as the complete request.
    ///
    /// Resolves once the response head has arrived; transport failures before
    /// that point resolve to `Err`, failures afterwards surface as an `Err`
    /// item on the stream.
    fn open(&self, endpoint: &Endpoint, body: Bytes) -> BoxFuture<'static, Result<ChunkStream>>;
}
