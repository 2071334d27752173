//! # cityfeed-client
//!
//! Streaming client for the city incident feeds served over the Connect JSON
//! envelope protocol.
//!
//! Each feed is one HTTP POST whose body is a single length-prefixed JSON
//! frame; the response is an unbounded sequence of such frames delivered as
//! chunked transfer and de-framed incrementally.
//!
//! ## Architecture
//!
//! - **Protocol**: 5-byte envelope header, pure `decode_frames`, and the
//!   `FrameBuffer` accumulator that carries partial frames across chunks
//! - **Session**: one exchange, one read loop, cooperative cancellation
//! - **Feeds**: the four feed flavours as configuration plus alias
//!   normalization into typed records
//!
//! ## Example
//!
//! ```no_run
//! use cityfeed_client::{FeedClient, FeedParams, FeedSpec};
//!
//! #[tokio::main]
//! async fn main() -> cityfeed_client::Result<()> {
//!     let client = FeedClient::from_env()?;
//!     let traffic = client.subscribe(FeedSpec::traffic(), FeedParams::default());
//!
//!     let mut snapshots = traffic.watch();
//!     while snapshots.changed().await.is_ok() {
//!         let snapshot = snapshots.borrow_and_update().clone();
//!         println!("{:?}: {} digest entries", snapshot.status, snapshot.collections.traffic_digest.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod feeds;
pub mod normalize;
pub mod protocol;
pub mod session;
pub mod subscription;
pub mod transport;

mod client;

pub use client::{ClientBuilder, FeedClient};
pub use config::ClientConfig;
pub use error::{FeedError, FrameError, Result};
pub use feeds::{FeedKind, FeedParams, FeedSpec, FeedUpdate, FeedUpdates};
pub use session::{Session, SessionState, SessionStream};
pub use subscription::{FeedSnapshot, FeedStatus, Subscription};
