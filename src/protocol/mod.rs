//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the Connect JSON envelope:
//! - 5-byte header encoding/decoding
//! - Frame construction on the sending side
//! - Pure de-framing plus the accumulator for partial reads

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, encode_frame, Frame};
pub use frame_buffer::{decode_frames, Decoded, DecodedFrame, FrameBuffer, Message};
pub use wire_format::{
    flags, Header, CONNECT_JSON_CONTENT_TYPE, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE,
};
