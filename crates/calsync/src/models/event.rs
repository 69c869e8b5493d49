//! Event record model for imported provider events
//!
//! Imported events are sink-of-truth from the provider: they are written
//! and deleted by the sync engine, never edited locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator between calendar id and event id in an [`EventUid`].
const UID_SEPARATOR: &str = "__";

/// Globally unique, deterministic key for a stored event:
/// `"{calendar_id}__{event_id}"`.
///
/// Every upsert and delete is keyed by this value, which is what makes
/// replaying a write batch converge instead of duplicating documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventUid(pub String);

impl EventUid {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Build the uid from its parts.
    pub fn from_parts(calendar_id: &str, event_id: &str) -> Self {
        Self(format!("{}{}{}", calendar_id, UID_SEPARATOR, event_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into `(calendar_id, event_id)` if well-formed.
    pub fn parts(&self) -> Option<(&str, &str)> {
        self.0.split_once(UID_SEPARATOR)
    }
}

impl From<String> for EventUid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EventUid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The provider's original start/end value, preserved verbatim.
///
/// Either `date` (all-day) or `date_time` (timed) is set; `time_zone`
/// carries the provider's IANA zone when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// A normalized provider event as stored by the product.
///
/// `day_keys`, `month_keys` and `fiscal_year_keys` are the index keys the
/// academic-calendar side queries by; they are computed in the event's
/// provider time zone, not the host's local zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub calendar_id: String,
    pub event_id: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Local calendar date of the event start (`YYYY-MM-DD`).
    pub start_date_key: String,
    /// Local calendar date of the event end (`YYYY-MM-DD`), inclusive.
    pub end_date_key: String,
    /// Start instant, epoch milliseconds.
    pub start_ts: i64,
    /// End instant, epoch milliseconds.
    pub end_ts: i64,
    pub all_day: bool,
    /// Every local calendar date the event touches, gap-free.
    pub day_keys: Vec<String>,
    /// Every `YYYY-MM` the event touches.
    pub month_keys: Vec<String>,
    /// Every April-start fiscal year the event touches.
    pub fiscal_year_keys: Vec<String>,
    /// Provider status, e.g. "confirmed" or "tentative".
    pub status: String,
    pub start_raw: RawEventTime,
    pub end_raw: RawEventTime,
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(default)]
    pub color_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRecord {
    /// The idempotency key this record is stored under.
    pub fn uid(&self) -> EventUid {
        EventUid::from_parts(&self.calendar_id, &self.event_id)
    }
}
