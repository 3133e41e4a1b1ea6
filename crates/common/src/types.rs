//! Domain types shared across the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lower bound of the valid AQI domain, inclusive.
pub const AQI_MIN: i64 = 0;

/// Upper bound of the valid AQI domain, inclusive.
pub const AQI_MAX: i64 = 500;

/// Where a reading's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    /// The provider reported the canonical measured index.
    #[default]
    Measured,
    /// The canonical index was unavailable and a model-interpolated
    /// stand-in was used instead.
    Interpolated,
}

/// A single air-quality reading for one location.
///
/// `last_update` is kept as an RFC 3339 string — the same shape the
/// documents carry in the store. Parsing happens where ordering is needed;
/// a reading whose timestamp fails to parse is dropped by those callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqiReading {
    #[serde(rename = "AQI")]
    pub aqi: i64,

    /// RFC 3339 timestamp of the observation.
    pub last_update: String,

    #[serde(default)]
    pub source: ReadingSource,

    /// Raw provider payload (pollutant breakdown, coordinates).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl AqiReading {
    /// Parse `last_update` into a UTC instant, or `None` if malformed.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.last_update)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Normalize a raw location name into a series key.
pub fn normalize_location(raw: &str) -> String {
    raw.trim().to_string()
}

/// Top-level document persisted per location key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CityDoc {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
}

// ── Tracking types ────────────────────────────────────────────────────

/// One tracked location in a user's tracked set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntry {
    /// RFC 3339 timestamp of when tracking started.
    pub added_at: String,
    #[serde(default)]
    pub notify: bool,
}

/// A user's persisted document: the tracked map keyed by location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDoc {
    #[serde(default)]
    pub tracked: BTreeMap<String, TrackedEntry>,
}

/// A tracked location joined with its current history view.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedView {
    pub location: String,
    pub entry: TrackedEntry,
    /// Newest first; empty when the per-key read degraded.
    pub history: Vec<AqiReading>,
}

/// Outcome of a track call. Tracking an already-tracked location is an
/// idempotent success, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Added,
    AlreadyTracked,
}

/// Outcome of an untrack call; removing an absent entry is a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UntrackOutcome {
    Removed,
    NotTracked,
}

// ── Identity types ────────────────────────────────────────────────────

/// Authorization role, resolved once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    Admin,
}

/// An authenticated caller identity. The core uses it only to scope the
/// tracked map and to consume the role flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub uid: String,
    pub email: String,
    pub role: Role,
}
