//! Error types for cityfeed-client.

use thiserror::Error;

/// Main error type for all feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    /// I/O error on the underlying connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error (connection refused, reset mid-stream, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
    },

    /// Transport failure not covered by the HTTP client.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Protocol error (oversized frame, malformed envelope, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A frame declared a compressed or otherwise unsupported payload.
    #[error("Unsupported envelope flags 0x{flags:02x}")]
    UnsupportedCompression {
        /// The raw flags byte from the frame header.
        flags: u8,
    },

    /// The server ended the stream with an error trailer.
    #[error("Remote error [{code}]: {message}")]
    Remote {
        /// Connect error code (e.g. `unavailable`).
        code: String,
        /// Human readable message.
        message: String,
    },

    /// Configuration value could not be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FeedError {
    /// Whether this error came from the transport rather than from decoding.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FeedError::Io(_) | FeedError::Http(_) | FeedError::Status { .. } | FeedError::Transport(_)
        )
    }
}

/// Per-frame decode failure reported by [`decode_frames`](crate::protocol::decode_frames).
///
/// The frame boundary itself was well-formed; only its content is unusable.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Payload bytes were not valid UTF-8 JSON.
    #[error("Invalid JSON frame at offset {offset}: {source}")]
    Malformed {
        /// Offset of the frame header within the decoded buffer.
        offset: usize,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// Header flags declared a compressed payload.
    #[error("Unsupported envelope flags 0x{flags:02x} at offset {offset}")]
    UnsupportedCompression {
        /// Offset of the frame header within the decoded buffer.
        offset: usize,
        /// The raw flags byte.
        flags: u8,
    },
}

impl FrameError {
    /// Fatal frame errors terminate the session; others only skip the frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::UnsupportedCompression { .. })
    }
}

impl From<FrameError> for FeedError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Malformed { source, .. } => FeedError::Json(source),
            FrameError::UnsupportedCompression { flags, .. } => {
                FeedError::UnsupportedCompression { flags }
            }
        }
    }
}

/// Result type alias using FeedError.
pub type Result<T> = std::result::Result<T, FeedError>;
