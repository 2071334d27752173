//! JSON codec using `serde_json`.
//!
//! Payloads are compact JSON (no whitespace), matching what the browser's
//! `JSON.stringify` produced for the same request objects.

use serde_json::Value;

use crate::error::Result;

/// JSON codec for frame payloads.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to compact JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Decode JSON bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not UTF-8 JSON matching type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decode JSON bytes to an untyped value, keeping the raw parse error.
    #[inline]
    pub fn decode_value(bytes: &[u8]) -> std::result::Result<Value, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Parse JSON that arrived as a string field, tolerating Python-style
    /// single quotes.
    ///
    /// Returns `None` when neither form parses.
    pub fn decode_lenient(text: &str) -> Option<Value> {
        if let Ok(value) = serde_json::from_str(text) {
            return Some(value);
        }
        serde_json::from_str(&text.replace('\'', "\"")).ok()
    }
}
