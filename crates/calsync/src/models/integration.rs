//! Per-user integration state for the external calendar provider
//!
//! One [`IntegrationRecord`] exists per user. It holds the OAuth tokens,
//! the cached provider calendar list with the user's selection, and the
//! per-calendar incremental sync cursors.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of the most recent sync run.
///
/// `Syncing` holds only while a run is in flight; every run leaves the
/// record `Idle` or `Error` on exit, including on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Error,
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Idle
    }
}

/// One calendar from the provider's calendar list.
///
/// `selected` is the only field a previous sync carries forward; all
/// other fields are overwritten with the latest provider values on every
/// list refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub primary: bool,
    pub access_role: String,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub foreground_color: Option<String>,
    pub selected: bool,
}

/// Per-user provider integration state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationRecord {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Access token expiry, epoch milliseconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Opaque incremental-sync cursor per calendar id. A missing entry
    /// means the next sync for that calendar is a full windowed fetch.
    #[serde(default)]
    pub sync_tokens: BTreeMap<String, String>,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub calendar_list: Vec<CalendarListEntry>,
    #[serde(default)]
    pub last_sync_status: SyncStatus,
    #[serde(default)]
    pub last_sync_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl IntegrationRecord {
    /// A fresh record with no tokens and no calendars.
    pub fn empty() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            token_type: None,
            scope: None,
            expires_at: None,
            sync_tokens: BTreeMap::new(),
            last_synced_at: None,
            calendar_list: Vec::new(),
            last_sync_status: SyncStatus::Idle,
            last_sync_error: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether the access token is missing or expires within `slack_ms`.
    pub fn token_needs_refresh(&self, now_ms: i64, slack_ms: i64) -> bool {
        match (&self.access_token, self.expires_at) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(_), Some(expires_at)) => expires_at - slack_ms <= now_ms,
        }
    }
}

/// A partial update to an [`IntegrationRecord`].
///
/// Fields left `None` are untouched. `last_sync_error` is doubly
/// optional so it can be explicitly cleared. Stores stamp `updated_at`
/// on every applied patch.
#[derive(Debug, Clone, Default)]
pub struct IntegrationPatch {
    /// Replace the whole record with an empty one before applying the
    /// rest of the patch. Used by the disconnect flow.
    pub reset: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_at: Option<i64>,
    pub sync_tokens: Option<BTreeMap<String, String>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub calendar_list: Option<Vec<CalendarListEntry>>,
    pub last_sync_status: Option<SyncStatus>,
    pub last_sync_error: Option<Option<String>>,
}

impl IntegrationPatch {
    /// A patch that only transitions the sync status, setting or
    /// clearing the error message with it.
    pub fn status(status: SyncStatus, error: Option<String>) -> Self {
        Self {
            last_sync_status: Some(status),
            last_sync_error: Some(error),
            ..Self::default()
        }
    }

    /// A patch that wipes the record back to its empty state.
    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Self::default()
        }
    }

    /// Apply this patch to a record in place. Does not stamp
    /// `updated_at`; that is the store's job.
    pub fn apply(self, record: &mut IntegrationRecord) {
        if self.reset {
            *record = IntegrationRecord::empty();
        }
        if let Some(v) = self.access_token {
            record.access_token = Some(v);
        }
        if let Some(v) = self.refresh_token {
            record.refresh_token = Some(v);
        }
        if let Some(v) = self.token_type {
            record.token_type = Some(v);
        }
        if let Some(v) = self.scope {
            record.scope = Some(v);
        }
        if let Some(v) = self.expires_at {
            record.expires_at = Some(v);
        }
        if let Some(v) = self.sync_tokens {
            record.sync_tokens = v;
        }
        if let Some(v) = self.last_synced_at {
            record.last_synced_at = Some(v);
        }
        if let Some(v) = self.calendar_list {
            record.calendar_list = v;
        }
        if let Some(v) = self.last_sync_status {
            record.last_sync_status = v;
        }
        if let Some(v) = self.last_sync_error {
            record.last_sync_error = v;
        }
    }
}
