//! The four city feeds as configuration.
//!
//! Every feed is the same session with a different endpoint, request shape
//! and alias table. A [`FeedSpec`] carries those three things; the typed
//! records and the [`FeedUpdate`] union are resolved from it once per
//! payload, at the normalization boundary.
//!
//! | Feed | Request | Collections |
//! |------|---------|-------------|
//! | [`FeedSpec::summary`] | `{lat, long, areas}` | `summary` (text) |
//! | [`FeedSpec::traffic`] | `{}` | `traffic_digest`, `weather` |
//! | [`FeedSpec::energy`] | `{}` | `outages` |
//! | [`FeedSpec::culture`] | `{areas}` | `cultural_events` |
//!
//! # Example
//!
//! ```
//! use cityfeed_client::feeds::{FeedSpec, FeedUpdate};
//! use serde_json::json;
//!
//! let traffic = FeedSpec::traffic().with_alias("traffic_digest", "digest_v3");
//!
//! let updates = traffic.resolve(&json!({
//!     "digest_v3": [{ "location": "Silk Board", "delay": "25 min" }]
//! }));
//!
//! match &updates[0] {
//!     FeedUpdate::TrafficDigest(entries) => assert_eq!(entries[0].location, "Silk Board"),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{ready, Stream};
use pin_project_lite::pin_project;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;
use crate::normalize::{Extracted, FieldAliases, NormalizedPayload, Normalizer};
use crate::session::SessionStream;
use crate::transport::Endpoint;

/// Logical collection names.
pub mod collections {
    /// Area summary text.
    pub const SUMMARY: &str = "summary";
    /// Traffic digest entries.
    pub const TRAFFIC_DIGEST: &str = "traffic_digest";
    /// Weather summaries.
    pub const WEATHER: &str = "weather";
    /// Power outage summaries.
    pub const OUTAGES: &str = "outages";
    /// Cultural event listings.
    pub const CULTURAL_EVENTS: &str = "cultural_events";
}

/// Which of the four feeds a spec describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Area summary.
    Summary,
    /// Traffic and weather updates.
    Traffic,
    /// Energy management events.
    Energy,
    /// Cultural events.
    Culture,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedKind::Summary => "summary",
            FeedKind::Traffic => "traffic",
            FeedKind::Energy => "energy",
            FeedKind::Culture => "culture",
        };
        f.write_str(name)
    }
}

/// Subscription parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedParams {
    /// Latitude of the map centre.
    pub lat: f64,
    /// Longitude of the map centre.
    pub long: f64,
    /// Area filters.
    pub areas: Vec<String>,
}

impl FeedParams {
    /// Parameters centred on a point, with no areas.
    pub fn at(lat: f64, long: f64) -> Self {
        Self {
            lat,
            long,
            areas: Vec::new(),
        }
    }

    /// Add an area filter.
    pub fn area(mut self, area: impl Into<String>) -> Self {
        self.areas.push(area.into());
        self
    }

    /// Replace the area filters.
    pub fn areas<I, S>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.areas = areas.into_iter().map(Into::into).collect();
        self
    }
}

/// Fields a feed sends in its request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// `{}`
    Empty,
    /// `{areas}`
    Areas,
    /// `{lat, long, areas}`
    Location,
}

impl RequestShape {
    /// Build the request body from `params`.
    pub fn body(self, params: &FeedParams) -> Value {
        match self {
            RequestShape::Empty => json!({}),
            RequestShape::Areas => json!({ "areas": params.areas }),
            RequestShape::Location => json!({
                "lat": params.lat,
                "long": params.long,
                "areas": params.areas,
            }),
        }
    }
}

/// Configuration for one feed flavour.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSpec {
    kind: FeedKind,
    endpoint: Endpoint,
    request: RequestShape,
    requires_areas: bool,
    normalizer: Normalizer,
}

impl FeedSpec {
    /// Area summary feed.
    pub fn summary() -> Self {
        Self {
            kind: FeedKind::Summary,
            endpoint: Endpoint::new("summary.v1.SummaryService", "StreamSummary"),
            request: RequestShape::Location,
            requires_areas: true,
            normalizer: Normalizer::new()
                .collection(FieldAliases::text(collections::SUMMARY).alias("summary")),
        }
    }

    /// Traffic digest and weather feed.
    pub fn traffic() -> Self {
        Self {
            kind: FeedKind::Traffic,
            endpoint: Endpoint::new(
                "trafficupdaterevents.v1.TrafficUpdateEventsService",
                "StreamTrafficUpdateEvents",
            ),
            request: RequestShape::Empty,
            requires_areas: false,
            normalizer: Normalizer::new()
                .collection(
                    FieldAliases::records(collections::TRAFFIC_DIGEST)
                        .alias("trafficDigest")
                        .alias("bengaluru_traffic_digest")
                        .alias("bengaluruTrafficDigest"),
                )
                .collection(
                    FieldAliases::records(collections::WEATHER)
                        .alias("weather")
                        .alias("locationWeather")
                        .encoded_alias("location_weather")
                        .unwrap_key("weather_summary")
                        .unwrap_key("weatherSummary"),
                ),
        }
    }

    /// Energy management (outage) feed.
    pub fn energy() -> Self {
        Self {
            kind: FeedKind::Energy,
            endpoint: Endpoint::new(
                "energymanagementevents.v1.EnergyManagementEventsService",
                "StreamEnergyManagementEvents",
            ),
            request: RequestShape::Empty,
            requires_areas: false,
            normalizer: Normalizer::new().collection(
                FieldAliases::records(collections::OUTAGES)
                    .alias("outageSummary")
                    .alias("outage_summary"),
            ),
        }
    }

    /// Cultural events feed.
    pub fn culture() -> Self {
        Self {
            kind: FeedKind::Culture,
            endpoint: Endpoint::new(
                "cultureeventsmanagement.v1.CulturalEventsManagementService",
                "StreamCulturalEventsManagementEvents",
            ),
            request: RequestShape::Areas,
            requires_areas: true,
            normalizer: Normalizer::new().collection(
                FieldAliases::records(collections::CULTURAL_EVENTS)
                    .alias("culturalEvents")
                    .alias("cultural_events"),
            ),
        }
    }

    /// Spec for `kind` with its default alias table.
    pub fn for_kind(kind: FeedKind) -> Self {
        match kind {
            FeedKind::Summary => Self::summary(),
            FeedKind::Traffic => Self::traffic(),
            FeedKind::Energy => Self::energy(),
            FeedKind::Culture => Self::culture(),
        }
    }

    /// Accept another field name for `collection`.
    ///
    /// Unknown collections are logged and ignored.
    pub fn with_alias(mut self, collection: &str, name: impl Into<String>) -> Self {
        self.add_alias(collection, name, false);
        self
    }

    /// Accept another field name that may hold a JSON-encoded string.
    pub fn with_encoded_alias(mut self, collection: &str, name: impl Into<String>) -> Self {
        self.add_alias(collection, name, true);
        self
    }

    fn add_alias(&mut self, collection: &str, name: impl Into<String>, accepts_encoded: bool) {
        if !self.normalizer.add_alias(collection, name, accepts_encoded) {
            tracing::warn!("Feed {} has no collection named {}", self.kind, collection);
        }
    }

    /// Override the endpoint.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Feed flavour.
    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    /// Endpoint this feed streams from.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Alias table.
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Whether the feed needs at least one area before it can be opened.
    pub fn requires_areas(&self) -> bool {
        self.requires_areas
    }

    /// Whether `params` are sufficient to open a session.
    pub fn accepts(&self, params: &FeedParams) -> bool {
        !self.requires_areas || !params.areas.is_empty()
    }

    /// Request body for `params`.
    pub fn request_body(&self, params: &FeedParams) -> Value {
        self.request.body(params)
    }

    /// Normalize a payload without resolving typed records.
    pub fn normalize(&self, payload: &Value) -> NormalizedPayload {
        self.normalizer.normalize(payload)
    }

    /// Resolve a payload into typed updates, one per collection present.
    ///
    /// An empty result is a no-op frame.
    pub fn resolve(&self, payload: &Value) -> Vec<FeedUpdate> {
        self.normalize(payload)
            .into_collections()
            .into_iter()
            .filter_map(|(collection, extracted)| FeedUpdate::from_extracted(&collection, extracted))
            .collect()
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) if !s.is_empty() => vec![s],
        _ => Vec::new(),
    })
}

/// One traffic digest line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrafficDigestEntry {
    /// When the entry was reported, as sent.
    #[serde(deserialize_with = "lenient_string")]
    pub timestamp: String,
    /// Road or junction.
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
    /// What is happening.
    #[serde(deserialize_with = "lenient_string")]
    pub summary: String,
    /// Why the entry is rated as it is.
    #[serde(alias = "severity_reason", deserialize_with = "lenient_string")]
    pub severity_reason: String,
    /// Expected delay.
    #[serde(deserialize_with = "lenient_string")]
    pub delay: String,
    /// Suggested action for commuters.
    #[serde(deserialize_with = "lenient_string")]
    pub advice: String,
}

/// Weather for one location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherSummary {
    /// Area the reading applies to.
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
    /// Temperature, unit included by the producer.
    #[serde(deserialize_with = "lenient_string")]
    pub temperature: String,
    /// Sky conditions.
    #[serde(deserialize_with = "lenient_string")]
    pub conditions: String,
    /// Rainfall.
    #[serde(deserialize_with = "lenient_string")]
    pub precipitation: String,
    /// Wind speed and direction.
    #[serde(deserialize_with = "lenient_string")]
    pub wind: String,
}

/// A power outage notice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutageSummaryEntry {
    /// When the notice was issued.
    #[serde(deserialize_with = "lenient_string")]
    pub timestamp: String,
    /// Affected areas.
    #[serde(deserialize_with = "lenient_strings")]
    pub locations: Vec<String>,
    /// Short description.
    #[serde(deserialize_with = "lenient_string")]
    pub summary: String,
    /// Severity label.
    #[serde(deserialize_with = "lenient_string")]
    pub severity: String,
    /// Scheduled or observed start.
    #[serde(alias = "start_time", deserialize_with = "lenient_string")]
    pub start_time: String,
    /// Expected restoration.
    #[serde(alias = "end_time", deserialize_with = "lenient_string")]
    pub end_time: String,
    /// Cause of the outage.
    #[serde(deserialize_with = "lenient_string")]
    pub reason: String,
    /// Guidance for residents.
    #[serde(deserialize_with = "lenient_string")]
    pub advice: String,
}

/// A cultural event listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CulturalEventsEntry {
    /// Date of the event.
    #[serde(alias = "event_date", deserialize_with = "lenient_string")]
    pub event_date: String,
    /// Start time.
    #[serde(alias = "event_time", deserialize_with = "lenient_string")]
    pub event_time: String,
    /// Event name.
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    /// Venue name.
    #[serde(deserialize_with = "lenient_string")]
    pub venue: String,
    /// Neighbourhood.
    #[serde(deserialize_with = "lenient_string")]
    pub area: String,
    /// Event category.
    #[serde(deserialize_with = "lenient_string")]
    pub category: String,
    /// Ticket price, free text.
    #[serde(deserialize_with = "lenient_string")]
    pub price: String,
    /// Listing URL.
    #[serde(deserialize_with = "lenient_string")]
    pub link: String,
    /// Longer description.
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
}

/// Typed content of one collection in one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    /// Latest area summary.
    Summary(String),
    /// Traffic digest entries.
    TrafficDigest(Vec<TrafficDigestEntry>),
    /// Weather summaries.
    Weather(Vec<WeatherSummary>),
    /// Outage summaries.
    Outages(Vec<OutageSummaryEntry>),
    /// Cultural events.
    CulturalEvents(Vec<CulturalEventsEntry>),
}

impl FeedUpdate {
    fn from_extracted(collection: &str, extracted: Extracted) -> Option<Self> {
        let update = match (collection, extracted) {
            (collections::SUMMARY, Extracted::Text(text)) => FeedUpdate::Summary(text),
            (collections::TRAFFIC_DIGEST, Extracted::Records(records)) => {
                FeedUpdate::TrafficDigest(typed(collection, records))
            }
            (collections::WEATHER, Extracted::Records(records)) => {
                FeedUpdate::Weather(typed(collection, records))
            }
            (collections::OUTAGES, Extracted::Records(records)) => {
                FeedUpdate::Outages(typed(collection, records))
            }
            (collections::CULTURAL_EVENTS, Extracted::Records(records)) => {
                FeedUpdate::CulturalEvents(typed(collection, records))
            }
            (other, _) => {
                tracing::trace!("No typed update for collection {}", other);
                return None;
            }
        };
        Some(update)
    }

    /// Collection this update belongs to.
    pub fn collection(&self) -> &'static str {
        match self {
            FeedUpdate::Summary(_) => collections::SUMMARY,
            FeedUpdate::TrafficDigest(_) => collections::TRAFFIC_DIGEST,
            FeedUpdate::Weather(_) => collections::WEATHER,
            FeedUpdate::Outages(_) => collections::OUTAGES,
            FeedUpdate::CulturalEvents(_) => collections::CULTURAL_EVENTS,
        }
    }
}

fn typed<T: DeserializeOwned>(collection: &str, records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping malformed {} record: {}", collection, e);
                None
            }
        })
        .collect()
}

/// Collections accumulated across payloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedCollections {
    /// Latest summary text.
    pub summary: Option<String>,
    /// Traffic digest entries in arrival order.
    pub traffic_digest: Vec<TrafficDigestEntry>,
    /// Weather summaries in arrival order.
    pub weather: Vec<WeatherSummary>,
    /// Outage summaries in arrival order.
    pub outages: Vec<OutageSummaryEntry>,
    /// Cultural events in arrival order.
    pub cultural_events: Vec<CulturalEventsEntry>,
}

impl FeedCollections {
    /// Fold one update in. Records append; summary text replaces.
    pub fn apply(&mut self, update: FeedUpdate) {
        match update {
            FeedUpdate::Summary(text) => self.summary = Some(text),
            FeedUpdate::TrafficDigest(entries) => self.traffic_digest.extend(entries),
            FeedUpdate::Weather(entries) => self.weather.extend(entries),
            FeedUpdate::Outages(entries) => self.outages.extend(entries),
            FeedUpdate::CulturalEvents(entries) => self.cultural_events.extend(entries),
        }
    }

    /// Empty every collection.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.traffic_digest.is_empty()
            && self.weather.is_empty()
            && self.outages.is_empty()
            && self.cultural_events.is_empty()
    }
}

pin_project! {
    /// Stream of typed updates for one feed.
    ///
    /// Payloads that resolve to nothing are skipped. A terminal session error
    /// is yielded once, then the stream ends.
    pub struct FeedUpdates<S = SessionStream> {
        #[pin]
        payloads: S,
        spec: Arc<FeedSpec>,
        pending: VecDeque<FeedUpdate>,
    }
}

impl<S> FeedUpdates<S>
where
    S: Stream<Item = Result<Value>>,
{
    /// Resolve payloads from `payloads` with `spec`.
    pub fn new(payloads: S, spec: Arc<FeedSpec>) -> Self {
        Self {
            payloads,
            spec,
            pending: VecDeque::new(),
        }
    }

    /// Feed spec used to resolve payloads.
    pub fn spec(&self) -> &FeedSpec {
        &self.spec
    }
}

impl FeedUpdates<SessionStream> {
    /// Cancel the underlying session.
    pub fn cancel(&mut self) {
        self.pending.clear();
        self.payloads.cancel();
    }
}

impl<S> Stream for FeedUpdates<S>
where
    S: Stream<Item = Result<Value>>,
{
    type Item = Result<FeedUpdate>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(update) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(update)));
            }
            match ready!(this.payloads.as_mut().poll_next(cx)) {
                Some(Ok(payload)) => this.pending.extend(this.spec.resolve(&payload)),
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use futures::StreamExt;

    #[test]
    fn test_endpoints() {
        assert_eq!(
            FeedSpec::summary().endpoint().path(),
            "/summary.v1.SummaryService/StreamSummary"
        );
        assert_eq!(
            FeedSpec::traffic().endpoint().path(),
            "/trafficupdaterevents.v1.TrafficUpdateEventsService/StreamTrafficUpdateEvents"
        );
        assert_eq!(
            FeedSpec::energy().endpoint().path(),
            "/energymanagementevents.v1.EnergyManagementEventsService/StreamEnergyManagementEvents"
        );
        assert_eq!(
            FeedSpec::culture().endpoint().path(),
            "/cultureeventsmanagement.v1.CulturalEventsManagementService/StreamCulturalEventsManagementEvents"
        );
    }

    #[test]
    fn test_request_bodies() {
        let params = FeedParams::at(12.97, 77.64).area("Indiranagar");

        assert_eq!(
            FeedSpec::summary().request_body(&params),
            json!({ "lat": 12.97, "long": 77.64, "areas": ["Indiranagar"] })
        );
        assert_eq!(FeedSpec::traffic().request_body(&params), json!({}));
        assert_eq!(FeedSpec::energy().request_body(&params), json!({}));
        assert_eq!(
            FeedSpec::culture().request_body(&params),
            json!({ "areas": ["Indiranagar"] })
        );
    }

    #[test]
    fn test_area_gate() {
        let none = FeedParams::at(12.97, 77.64);
        let some = none.clone().area("HSR Layout");

        assert!(!FeedSpec::summary().accepts(&none));
        assert!(FeedSpec::summary().accepts(&some));
        assert!(!FeedSpec::culture().accepts(&none));
        assert!(FeedSpec::traffic().accepts(&none));
        assert!(FeedSpec::energy().accepts(&none));
    }

    #[test]
    fn test_traffic_aliases_merge() {
        let spec = FeedSpec::traffic();
        let updates = spec.resolve(&json!({
            "id": "1",
            "bengaluru_traffic_digest": [{ "location": "A", "severityReason": "rain" }],
            "trafficDigest": [{ "location": "B", "severity_reason": "accident" }],
            "location_weather": "[{'weather_summary': {'location': 'HSR', 'temperature': 28}}]"
        }));

        assert_eq!(updates.len(), 2);
        match &updates[0] {
            FeedUpdate::TrafficDigest(entries) => {
                // Declaration order: trafficDigest first.
                assert_eq!(entries[0].location, "B");
                assert_eq!(entries[0].severity_reason, "accident");
                assert_eq!(entries[1].location, "A");
                assert_eq!(entries[1].severity_reason, "rain");
            }
            other => panic!("unexpected {:?}", other),
        }
        match &updates[1] {
            FeedUpdate::Weather(entries) => {
                assert_eq!(entries[0].location, "HSR");
                assert_eq!(entries[0].temperature, "28");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_summary_text() {
        let updates = FeedSpec::summary().resolve(&json!({ "summary": "Heavy rain in HSR" }));
        assert_eq!(updates, vec![FeedUpdate::Summary("Heavy rain in HSR".into())]);
    }

    #[test]
    fn test_outage_records() {
        let updates = FeedSpec::energy().resolve(&json!({
            "outage_summary": [{
                "locations": "Koramangala",
                "severity": "high",
                "start_time": "10:00",
                "endTime": "12:00"
            }]
        }));

        let FeedUpdate::Outages(entries) = &updates[0] else {
            panic!("expected outages");
        };
        assert_eq!(entries[0].locations, vec!["Koramangala".to_string()]);
        assert_eq!(entries[0].start_time, "10:00");
        assert_eq!(entries[0].end_time, "12:00");
        assert_eq!(entries[0].advice, "");
    }

    #[test]
    fn test_malformed_record_skipped() {
        let updates = FeedSpec::culture().resolve(&json!({
            "culturalEvents": [
                { "title": "Jazz night", "eventDate": "2024-06-01" },
                "not a record",
                { "title": "Book fair" }
            ]
        }));

        let FeedUpdate::CulturalEvents(entries) = &updates[0] else {
            panic!("expected cultural events");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_date, "2024-06-01");
        assert_eq!(entries[1].title, "Book fair");
    }

    #[test]
    fn test_unrecognized_payload() {
        assert!(FeedSpec::energy().resolve(&json!({ "id": "x", "timestamp": 1 })).is_empty());
    }

    #[test]
    fn test_with_alias() {
        let spec = FeedSpec::energy()
            .with_alias(collections::OUTAGES, "outages_v2")
            .with_alias("nonexistent", "ignored");

        let updates = spec.resolve(&json!({ "outages_v2": [{ "summary": "grid maintenance" }] }));
        assert_eq!(updates[0].collection(), collections::OUTAGES);
    }

    #[test]
    fn test_collections_apply() {
        let mut collected = FeedCollections::default();
        assert!(collected.is_empty());

        collected.apply(FeedUpdate::Summary("first".into()));
        collected.apply(FeedUpdate::Summary("second".into()));
        collected.apply(FeedUpdate::Outages(vec![OutageSummaryEntry::default()]));
        collected.apply(FeedUpdate::Outages(vec![OutageSummaryEntry::default()]));

        assert_eq!(collected.summary.as_deref(), Some("second"));
        assert_eq!(collected.outages.len(), 2);

        collected.clear();
        assert!(collected.is_empty());
    }

    #[tokio::test]
    async fn test_feed_updates_stream() {
        let payloads = futures::stream::iter(vec![
            Ok(json!({ "outageSummary": [{ "summary": "a" }] })),
            Ok(json!({ "unrelated": true })),
            Ok(json!({ "outage_summary": [{ "summary": "b" }] })),
            Err(FeedError::Status { status: 500 }),
        ]);

        let updates: Vec<_> = FeedUpdates::new(payloads, Arc::new(FeedSpec::energy()))
            .collect()
            .await;

        assert_eq!(updates.len(), 3);
        assert!(matches!(&updates[0], Ok(FeedUpdate::Outages(e)) if e[0].summary == "a"));
        assert!(matches!(&updates[1], Ok(FeedUpdate::Outages(e)) if e[0].summary == "b"));
        assert!(matches!(&updates[2], Err(FeedError::Status { status: 500 })));
    }
}
