//! Alias normalization for decoded payloads.
//!
//! Producers have shipped the same logical array under several names over
//! time (`trafficDigest`, `bengaluru_traffic_digest`, ...). A [`FieldAliases`]
//! lists every accepted name for one logical collection; a [`Normalizer`]
//! applies a set of them to each payload and merges whatever it finds.
//!
//! Rules:
//! - Every alias present contributes, in the order the aliases were declared.
//! - A record collection only accepts JSON arrays. An alias marked as
//!   *encoded* may also hold a string containing a JSON array.
//! - A text collection accepts a non-empty string.
//! - Unknown fields are ignored. A payload matching nothing is a no-op.
//!
//! # Example
//!
//! ```
//! use cityfeed_client::normalize::{FieldAliases, Normalizer};
//! use serde_json::json;
//!
//! let normalizer = Normalizer::new()
//!     .collection(FieldAliases::records("digest").alias("fooBar").alias("foo_bar"));
//!
//! let first = normalizer.normalize(&json!({ "fooBar": [1] }));
//! let second = normalizer.normalize(&json!({ "foo_bar": [2], "other": true }));
//!
//! assert_eq!(first.records("digest"), Some(&[json!(1)][..]));
//! assert_eq!(second.records("digest"), Some(&[json!(2)][..]));
//! ```

use serde_json::{Map, Value};

use crate::codec::JsonCodec;

/// What kind of value a logical collection holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// Array of records; every matching alias is appended.
    Records,
    /// Single text value; the last matching alias wins.
    Text,
}

/// One accepted field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    name: String,
    accepts_encoded: bool,
    unwrap_keys: Vec<String>,
}

impl Alias {
    /// Field name on the wire.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a string holding JSON is accepted for this alias.
    pub fn accepts_encoded(&self) -> bool {
        self.accepts_encoded
    }

    /// Keys whose nested value replaces a record taken from this alias.
    pub fn unwrap_keys(&self) -> &[String] {
        &self.unwrap_keys
    }

    fn unwrap(&self, record: Value) -> Value {
        if let Value::Object(fields) = &record {
            for key in &self.unwrap_keys {
                match fields.get(key) {
                    Some(inner) if !inner.is_null() => return inner.clone(),
                    _ => {}
                }
            }
        }
        record
    }
}

/// Accepted field names for one logical collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAliases {
    collection: String,
    kind: CollectionKind,
    aliases: Vec<Alias>,
}

impl FieldAliases {
    /// New record collection with no aliases yet.
    pub fn records(collection: impl Into<String>) -> Self {
        Self::new(collection, CollectionKind::Records)
    }

    /// New text collection with no aliases yet.
    pub fn text(collection: impl Into<String>) -> Self {
        Self::new(collection, CollectionKind::Text)
    }

    fn new(collection: impl Into<String>, kind: CollectionKind) -> Self {
        Self {
            collection: collection.into(),
            kind,
            aliases: Vec::new(),
        }
    }

    /// Accept `name` for this collection.
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.push_alias(name.into(), false);
        self
    }

    /// Accept `name`, also when it holds a JSON-encoded string.
    pub fn encoded_alias(mut self, name: impl Into<String>) -> Self {
        self.push_alias(name.into(), true);
        self
    }

    /// Records from the most recently declared alias that carry `key` are
    /// replaced by the value nested under it. Other aliases are unaffected.
    ///
    /// Keys are tried in declaration order. Ignored before any alias exists.
    pub fn unwrap_key(mut self, key: impl Into<String>) -> Self {
        match self.aliases.last_mut() {
            Some(alias) => alias.unwrap_keys.push(key.into()),
            None => tracing::debug!("No alias to unwrap for in {}", self.collection),
        }
        self
    }

    /// Add an alias in place. Duplicates are ignored.
    pub fn push_alias(&mut self, name: String, accepts_encoded: bool) {
        if self.aliases.iter().any(|a| a.name == name) {
            return;
        }
        self.aliases.push(Alias {
            name,
            accepts_encoded,
            unwrap_keys: Vec::new(),
        });
    }

    /// Logical collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Collection kind.
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Accepted aliases in check order.
    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    /// Extract this collection from a payload object.
    ///
    /// Returns `None` when no alias yields a usable value.
    pub fn extract(&self, object: &Map<String, Value>) -> Option<Extracted> {
        match self.kind {
            CollectionKind::Records => {
                let mut records = Vec::new();
                let mut matched = false;
                for alias in &self.aliases {
                    if let Some(items) = object.get(&alias.name).and_then(|v| self.as_array(alias, v)) {
                        matched = true;
                        records.extend(items.into_iter().map(|record| alias.unwrap(record)));
                    }
                }
                matched.then_some(Extracted::Records(records))
            }
            CollectionKind::Text => self
                .aliases
                .iter()
                .filter_map(|alias| match object.get(&alias.name) {
                    Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
                    _ => None,
                })
                .last()
                .map(Extracted::Text),
        }
    }

    fn as_array(&self, alias: &Alias, value: &Value) -> Option<Vec<Value>> {
        match value {
            Value::Array(items) => Some(items.clone()),
            Value::String(text) if alias.accepts_encoded => match JsonCodec::decode_lenient(text) {
                Some(Value::Array(items)) => Some(items),
                _ => {
                    tracing::debug!("Ignoring undecodable string in field {}", alias.name);
                    None
                }
            },
            _ => None,
        }
    }

}

/// Value extracted for one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// Records merged from every matching alias.
    Records(Vec<Value>),
    /// Text from the last matching alias.
    Text(String),
}

/// Result of normalizing one payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPayload {
    id: Option<String>,
    timestamp: Option<i64>,
    collections: Vec<(String, Extracted)>,
}

impl NormalizedPayload {
    /// Envelope id, if present.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Envelope timestamp, if present and numeric.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    /// Whether no known collection was present.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Records extracted for `collection`.
    pub fn records(&self, collection: &str) -> Option<&[Value]> {
        self.get(collection).and_then(|extracted| match extracted {
            Extracted::Records(records) => Some(records.as_slice()),
            Extracted::Text(_) => None,
        })
    }

    /// Text extracted for `collection`.
    pub fn text(&self, collection: &str) -> Option<&str> {
        self.get(collection).and_then(|extracted| match extracted {
            Extracted::Text(text) => Some(text.as_str()),
            Extracted::Records(_) => None,
        })
    }

    /// Extracted collections in declaration order.
    pub fn collections(&self) -> impl Iterator<Item = (&str, &Extracted)> {
        self.collections.iter().map(|(name, e)| (name.as_str(), e))
    }

    /// Consume into the extracted collections.
    pub fn into_collections(self) -> Vec<(String, Extracted)> {
        self.collections
    }

    fn get(&self, collection: &str) -> Option<&Extracted> {
        self.collections
            .iter()
            .find(|(name, _)| name == collection)
            .map(|(_, e)| e)
    }
}

/// Applies a set of [`FieldAliases`] to payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalizer {
    collections: Vec<FieldAliases>,
}

impl Normalizer {
    /// Create an empty normalizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection.
    pub fn collection(mut self, aliases: FieldAliases) -> Self {
        self.collections.push(aliases);
        self
    }

    /// Add an alias to an existing collection.
    ///
    /// Returns `false` if no collection has that name.
    pub fn add_alias(&mut self, collection: &str, name: impl Into<String>, accepts_encoded: bool) -> bool {
        match self.collections.iter_mut().find(|c| c.collection == collection) {
            Some(aliases) => {
                aliases.push_alias(name.into(), accepts_encoded);
                true
            }
            None => false,
        }
    }

    /// Look up a collection by name.
    pub fn aliases(&self, collection: &str) -> Option<&FieldAliases> {
        self.collections.iter().find(|c| c.collection == collection)
    }

    /// Declared collections.
    pub fn collections(&self) -> &[FieldAliases] {
        &self.collections
    }

    /// Normalize one decoded payload.
    ///
    /// Non-object payloads normalize to an empty result.
    pub fn normalize(&self, payload: &Value) -> NormalizedPayload {
        let Value::Object(object) = payload else {
            return NormalizedPayload::default();
        };

        let collections = self
            .collections
            .iter()
            .filter_map(|aliases| {
                aliases
                    .extract(object)
                    .map(|extracted| (aliases.collection.clone(), extracted))
            })
            .collect();

        NormalizedPayload {
            id: object.get("id").and_then(scalar_string),
            timestamp: object.get("timestamp").and_then(integer),
            collections,
        }
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// int64 fields arrive as JSON strings from protobuf-JSON encoders.
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
