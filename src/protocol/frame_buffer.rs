//! Frame de-framing for accumulated reads.
//!
//! [`decode_frames`] is the pure scanner: given any byte buffer it returns
//! every complete frame in arrival order plus the unconsumed remainder.
//! [`FrameBuffer`] is the byte accumulator a session owns; it appends each
//! network chunk, runs the scanner and keeps only the remainder.
//!
//! Chunk boundaries never matter: a header or payload split across reads
//! stays in the remainder until the rest of it arrives.
//!
//! # Example
//!
//! ```
//! use cityfeed_client::protocol::{encode_frame, FrameBuffer};
//! use serde_json::json;
//!
//! let bytes = encode_frame(&json!({ "summary": "all clear" })).unwrap();
//! let mut buffer = FrameBuffer::new();
//!
//! assert!(buffer.push(&bytes[..3]).unwrap().is_empty());
//! let frames = buffer.push(&bytes[3..]).unwrap();
//! assert_eq!(frames.len(), 1);
//! assert!(buffer.is_empty());
//! ```

use bytes::{Buf, BytesMut};
use serde_json::Value;

use super::wire_format::{Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
use crate::codec::JsonCodec;
use crate::error::{FrameError, Result};

/// A successfully decoded frame payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Regular message frame.
    Data(Value),
    /// End-of-stream trailer frame.
    EndStream(Value),
}

impl Message {
    /// The parsed JSON payload, whatever the frame kind.
    pub fn value(&self) -> &Value {
        match self {
            Message::Data(v) | Message::EndStream(v) => v,
        }
    }

    /// Consume into the data payload; `None` for trailers.
    pub fn into_data(self) -> Option<Value> {
        match self {
            Message::Data(v) => Some(v),
            Message::EndStream(_) => None,
        }
    }
}

/// Outcome of decoding one well-framed frame.
pub type DecodedFrame = std::result::Result<Message, FrameError>;

/// Output of [`decode_frames`].
#[derive(Debug)]
pub struct Decoded<'a> {
    /// Per-frame outcomes, in arrival order.
    pub frames: Vec<DecodedFrame>,
    /// Bytes after the last complete frame (empty or a strict partial frame).
    pub remainder: &'a [u8],
}

/// Decode every complete frame at the front of `buffer`.
///
/// Scans from offset 0 while at least a header's worth of bytes remain. A
/// frame is only taken once all of its declared payload is present; anything
/// shorter is returned untouched as the remainder.
///
/// A payload that fails to parse is reported as [`FrameError::Malformed`] and
/// scanning continues at the next boundary. A header with unsupported flags is
/// reported as [`FrameError::UnsupportedCompression`]; its payload is never
/// interpreted.
pub fn decode_frames(buffer: &[u8]) -> Decoded<'_> {
    let mut frames = Vec::new();
    let mut offset = 0;

    while let Some(header) = Header::decode(&buffer[offset..]) {
        let frame_size = header.frame_size();
        if buffer.len() - offset < frame_size {
            break;
        }

        let payload = &buffer[offset + HEADER_SIZE..offset + frame_size];
        frames.push(decode_payload(header, payload, offset));
        offset += frame_size;
    }

    Decoded {
        frames,
        remainder: &buffer[offset..],
    }
}

fn decode_payload(header: Header, payload: &[u8], offset: usize) -> DecodedFrame {
    if !header.is_supported() {
        return Err(FrameError::UnsupportedCompression {
            offset,
            flags: header.flags,
        });
    }

    if header.is_end_stream() {
        // Trailers may be sent with no body at all.
        if payload.is_empty() {
            return Ok(Message::EndStream(Value::Object(Default::default())));
        }
        return JsonCodec::decode_value(payload)
            .map(Message::EndStream)
            .map_err(|source| FrameError::Malformed { offset, source });
    }

    JsonCodec::decode_value(payload)
        .map(Message::Data)
        .map_err(|source| FrameError::Malformed { offset, source })
}

/// Byte accumulator that turns arbitrary chunks into decoded frames.
///
/// After every [`push`](Self::push) the buffer holds either nothing or a
/// strict partial frame.
pub struct FrameBuffer {
    /// Bytes received but not yet resolved into complete frames.
    buffer: BytesMut,
    /// Maximum allowed payload size.
    max_payload_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 8KB, max payload: 16MB.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with custom max payload size.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            max_payload_size,
        }
    }

    /// Append a chunk and extract all frames it completes.
    ///
    /// Frames completed ahead of an oversized header are still returned; the
    /// header stays buffered and is reported by
    /// [`validate_pending`](Self::validate_pending) or by the next `push`.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Protocol` if no frame was completed and the pending
    /// frame declares a payload larger than the configured maximum. The
    /// buffer should not be reused after an error.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<DecodedFrame>> {
        self.buffer.extend_from_slice(data);

        let Decoded { frames, remainder } = decode_frames(&self.buffer);
        let consumed = self.buffer.len() - remainder.len();
        self.buffer.advance(consumed);

        if frames.is_empty() {
            self.validate_pending()?;
        }

        Ok(frames)
    }

    /// Check the header of the buffered partial frame, if one is complete.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Protocol` if it declares a payload larger than the
    /// configured maximum.
    pub fn validate_pending(&self) -> Result<()> {
        match Header::decode(&self.buffer) {
            Some(header) => header.validate(self.max_payload_size),
            None => Ok(()),
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The buffered remainder.
    pub fn remainder(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop any buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
