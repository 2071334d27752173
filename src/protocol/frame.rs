//! Frame struct and sender-side frame construction.
//!
//! A frame only lives long enough to be written (sender side) or decoded and
//! dispatched (receiver side). Payloads use `bytes::Bytes` so slicing a frame
//! out of the accumulator does not copy.
//!
//! # Example
//!
//! ```
//! use cityfeed_client::protocol::{decode_frames, encode_frame};
//! use serde_json::json;
//!
//! let bytes = encode_frame(&json!({ "areas": ["Indiranagar"] })).unwrap();
//! assert_eq!(bytes[0], 0x00);
//!
//! let decoded = decode_frames(&bytes);
//! assert_eq!(decoded.frames.len(), 1);
//! assert!(decoded.remainder.is_empty());
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use super::wire_format::{Header, HEADER_SIZE};
use crate::codec::JsonCodec;
use crate::error::{FeedError, Result};

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from header and payload.
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the flags byte.
    #[inline]
    pub fn flags(&self) -> u8 {
        self.header.flags
    }

    /// Check if this is the end-of-stream trailer.
    #[inline]
    pub fn is_end_stream(&self) -> bool {
        self.header.is_end_stream()
    }

    /// Serialize the frame back to wire bytes.
    pub fn to_bytes(&self) -> Bytes {
        build_frame(self.header.flags, &self.payload)
    }
}

/// Build a frame from a flags byte and raw payload.
///
/// The length field is taken from `payload`.
pub fn build_frame(flags: u8, payload: &[u8]) -> Bytes {
    let header = Header::new(flags, payload.len() as u32);
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_slice(&header.encode());
    buf.put_slice(payload);
    buf.freeze()
}

/// Encode a JSON-serializable value into one uncompressed frame.
///
/// # Errors
///
/// Returns `FeedError::Json` if the value cannot be serialized, or
/// `FeedError::Protocol` if the payload would not fit the 32-bit length field.
pub fn encode_frame<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    let payload = JsonCodec::encode(value)?;
    if payload.len() > u32::MAX as usize {
        return Err(FeedError::Protocol(format!(
            "Payload size {} does not fit a frame",
            payload.len()
        )));
    }
    Ok(build_frame(super::flags::NONE, &payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::flags;
    use serde_json::json;

    #[test]
    fn test_encode_frame_layout() {
        let bytes = encode_frame(&json!({ "a": 1 })).unwrap();
        let payload = br#"{"a":1}"#;

        assert_eq!(bytes.len(), HEADER_SIZE + payload.len());
        assert_eq!(bytes[0], flags::NONE);
        assert_eq!(&bytes[1..5], &(payload.len() as u32).to_be_bytes());
        assert_eq!(&bytes[5..], payload);
    }

    #[test]
    fn test_encode_empty_object() {
        let bytes = encode_frame(&json!({})).unwrap();
        assert_eq!(&bytes[..], &[0, 0, 0, 0, 2, b'{', b'}']);
    }

    #[test]
    fn test_encode_frame_multibyte_utf8_length() {
        // Length counts bytes, not characters.
        let bytes = encode_frame(&"ಬೆಂಗಳೂರು").unwrap();
        let header = Header::decode(&bytes).unwrap();
        assert_eq!(header.payload_length as usize, bytes.len() - HEADER_SIZE);
        assert!(header.payload_length as usize > "ಬೆಂಗಳೂರು".chars().count() + 2);
    }

    #[test]
    fn test_encode_frame_rejects_unserializable() {
        use std::collections::HashMap;

        // Non-string map keys cannot become JSON object keys.
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1);
        assert!(matches!(encode_frame(&map), Err(FeedError::Json(_))));
    }

    #[test]
    fn test_frame_to_bytes() {
        let frame = Frame::new(Header::new(flags::END_STREAM, 2), Bytes::from_static(b"{}"));
        assert!(frame.is_end_stream());
        assert_eq!(frame.flags(), flags::END_STREAM);
        assert_eq!(&frame.to_bytes()[..], &[0x02, 0, 0, 0, 2, b'{', b'}']);
        assert_eq!(frame.payload(), b"{}");
    }
}
