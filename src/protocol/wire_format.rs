//! Wire format encoding and decoding.
//!
//! Implements the 5-byte Connect envelope header:
//! ```text
//! ┌───────┬──────────┬─────────────────┐
//! │ Flags │ Length   │ Payload         │
//! │ 1 byte│ 4 bytes  │ Length bytes    │
//! │       │ uint32 BE│ UTF-8 JSON      │
//! └───────┴──────────┴─────────────────┘
//! ```
//!
//! Frames are concatenated back-to-back with no delimiter.

use crate::error::{FeedError, Result};

/// Header size in bytes (fixed, exactly 5).
pub const HEADER_SIZE: usize = 5;

/// Default maximum payload size (16 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Content type sent as both `Content-Type` and `Accept`.
pub const CONNECT_JSON_CONTENT_TYPE: &str = "application/connect+json; charset=utf-8";

/// Flag constants for the envelope flags byte.
pub mod flags {
    /// Payload is uncompressed UTF-8 JSON.
    pub const NONE: u8 = 0b0000_0000;
    /// Payload is compressed (never produced by this crate, never accepted).
    pub const COMPRESSED: u8 = 0b0000_0001;
    /// Final frame carrying the stream trailer.
    pub const END_STREAM: u8 = 0b0000_0010;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }

    /// Whether the flags byte describes a payload this crate can read.
    ///
    /// Only `NONE` and `END_STREAM` qualify.
    #[inline]
    pub fn is_supported(flags: u8) -> bool {
        flags & !END_STREAM == 0
    }
}

/// Decoded envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Flags byte (see `flags` module).
    pub flags: u8,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(flags: u8, payload_length: u32) -> Self {
        Self {
            flags,
            payload_length,
        }
    }

    /// Header for an uncompressed message frame.
    pub fn message(payload_length: u32) -> Self {
        Self::new(flags::NONE, payload_length)
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use cityfeed_client::protocol::Header;
    ///
    /// let bytes = Header::message(258).encode();
    /// assert_eq!(bytes, [0x00, 0x00, 0x00, 0x01, 0x02]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (5 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        buf[0] = self.flags;
        buf[1..5].copy_from_slice(&self.payload_length.to_be_bytes());
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            flags: buf[0],
            payload_length: u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]),
        })
    }

    /// Validate the header against a payload limit.
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if self.payload_length > max_payload_size {
            return Err(FeedError::Protocol(format!(
                "Payload size {} exceeds maximum {}",
                self.payload_length, max_payload_size
            )));
        }
        Ok(())
    }

    /// Total frame size (header + payload).
    #[inline]
    pub fn frame_size(&self) -> usize {
        HEADER_SIZE.saturating_add(self.payload_length as usize)
    }

    /// Check if the compressed bit is set.
    #[inline]
    pub fn is_compressed(&self) -> bool {
        flags::has_flag(self.flags, flags::COMPRESSED)
    }

    /// Check if this is the end-of-stream trailer frame.
    #[inline]
    pub fn is_end_stream(&self) -> bool {
        flags::has_flag(self.flags, flags::END_STREAM)
    }

    /// Check if the payload can be read as plain JSON.
    #[inline]
    pub fn is_supported(&self) -> bool {
        flags::is_supported(self.flags)
    }
}
