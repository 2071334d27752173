//! Property-based tests for the frame codec.
//!
//! Covers round-tripping, independence from chunk boundaries, and safety of
//! buffers too short to hold a header.

use cityfeed_client::protocol::{decode_frames, encode_frame, FrameBuffer, Message, HEADER_SIZE};
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Arbitrary JSON without floats (their text form does not round-trip exactly).
fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        ".{0,24}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z_]{1,12}", inner, 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Several values plus cut points for splitting their concatenated encoding.
fn frames_and_cuts() -> impl Strategy<Value = (Vec<Value>, Vec<usize>)> {
    (
        prop::collection::vec(json_strategy(), 1..5),
        prop::collection::vec(any::<usize>(), 0..12),
    )
}

fn data(frames: Vec<Result<Message, cityfeed_client::FrameError>>) -> Vec<Value> {
    frames
        .into_iter()
        .map(|f| f.expect("frame decodes").into_data().expect("data frame"))
        .collect()
}

proptest! {
    /// decode(encode(v)) yields exactly [v] and nothing left over.
    #[test]
    fn round_trip(value in json_strategy()) {
        let bytes = encode_frame(&value).unwrap();
        let decoded = decode_frames(&bytes);

        prop_assert!(decoded.remainder.is_empty());
        prop_assert_eq!(data(decoded.frames), vec![value]);
    }

    /// Any split of the byte stream decodes to the same frames as the whole.
    #[test]
    fn chunk_boundary_independence((values, cuts) in frames_and_cuts()) {
        let mut all = Vec::new();
        for value in &values {
            all.extend_from_slice(&encode_frame(value).unwrap());
        }

        let mut points: Vec<usize> = cuts.into_iter().map(|c| c % (all.len() + 1)).collect();
        points.push(0);
        points.push(all.len());
        points.sort_unstable();
        points.dedup();

        // Pure decoder, threading the remainder by hand.
        let mut remainder: Vec<u8> = Vec::new();
        let mut via_decode = Vec::new();
        for window in points.windows(2) {
            let mut buffer = std::mem::take(&mut remainder);
            buffer.extend_from_slice(&all[window[0]..window[1]]);
            let decoded = decode_frames(&buffer);
            remainder = decoded.remainder.to_vec();
            via_decode.extend(data(decoded.frames));
        }
        prop_assert!(remainder.is_empty());
        prop_assert_eq!(&via_decode, &values);

        // Accumulator.
        let mut buffer = FrameBuffer::new();
        let mut via_buffer = Vec::new();
        for window in points.windows(2) {
            via_buffer.extend(data(buffer.push(&all[window[0]..window[1]]).unwrap()));
        }
        prop_assert!(buffer.is_empty());
        prop_assert_eq!(&via_buffer, &values);
    }

    /// Fewer bytes than a header never decode and are returned untouched.
    #[test]
    fn partial_header_is_retained(bytes in prop::collection::vec(any::<u8>(), 1..HEADER_SIZE)) {
        let decoded = decode_frames(&bytes);
        prop_assert!(decoded.frames.is_empty());
        prop_assert_eq!(decoded.remainder, &bytes[..]);
    }

    /// A header followed by a short payload is retained whole.
    #[test]
    fn partial_payload_is_retained(value in json_strategy(), cut in any::<usize>()) {
        let bytes = encode_frame(&value).unwrap();
        let end = HEADER_SIZE + cut % (bytes.len() - HEADER_SIZE);
        let decoded = decode_frames(&bytes[..end]);

        prop_assert!(decoded.frames.is_empty());
        prop_assert_eq!(decoded.remainder, &bytes[..end]);
    }
}
