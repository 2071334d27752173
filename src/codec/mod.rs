//! Codec module - serialization/deserialization for payloads.
//!
//! - [`JsonCodec`] - UTF-8 JSON using `serde_json`, the only payload
//!   encoding the Connect JSON protocol carries.
//!
//! # Example
//!
//! ```
//! use cityfeed_client::codec::JsonCodec;
//!
//! let encoded = JsonCodec::encode(&"hello").unwrap();
//! let decoded: String = JsonCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod json;

pub use json::JsonCodec;
