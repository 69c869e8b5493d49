//! Sync orchestration
//!
//! `sync_calendars` is the top-level state machine: refresh the access
//! token, refresh the calendar list, merge the user's selection, then
//! walk each selected calendar sequentially (incrementally when a
//! cursor exists, as a full windowed pass otherwise) and persist the
//! accumulated writes through the store.
//!
//! Every run leaves `last_sync_status` at `Idle` or `Error`, including
//! when it fails. A calendar that fails mid-run is recorded in the
//! summary and does not abort the remaining calendars; partial
//! completion is fine because the next run resumes from each calendar's
//! stored cursor.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::error::{StorageError, SyncError};
use crate::google::{CalendarProvider, FetchMode, RefreshedToken, normalize_event};
use crate::models::{
    EventRecord, EventUid, IntegrationPatch, IntegrationRecord, SyncStatus,
};
use crate::storage::SyncStore;
use crate::sync::selection::merge_selection;
use crate::timekeys::SyncWindow;

/// Refresh the access token when it expires within this many ms.
const TOKEN_EXPIRY_SLACK_MS: i64 = 60_000;

/// Options for one orchestrator run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Ignore stored cursors and fetch every calendar windowed.
    pub force_full_sync: bool,
    /// Override the default window start.
    pub time_min: Option<DateTime<Utc>>,
    /// Override the default window end.
    pub time_max: Option<DateTime<Utc>>,
    /// Zone the default window is anchored in, and the fallback zone
    /// for events that carry none.
    pub zone: Tz,
    /// Advisory lease: a stored `Syncing` status younger than this
    /// blocks a new run; older is treated as a crashed run.
    pub lease_ttl: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            force_full_sync: false,
            time_min: None,
            time_max: None,
            zone: chrono_tz::UTC,
            lease_ttl: Duration::minutes(10),
        }
    }
}

/// Per-calendar result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarSyncOutcome {
    Synced {
        calendar_id: String,
        upserted: usize,
        removed: usize,
        /// The stored cursor was invalidated and this calendar went
        /// through full reconciliation.
        reset: bool,
    },
    Failed {
        calendar_id: String,
        error: String,
    },
}

impl CalendarSyncOutcome {
    pub fn calendar_id(&self) -> &str {
        match self {
            CalendarSyncOutcome::Synced { calendar_id, .. } => calendar_id,
            CalendarSyncOutcome::Failed { calendar_id, .. } => calendar_id,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CalendarSyncOutcome::Failed { .. })
    }
}

/// What one orchestrator run did. The only contract the rest of the
/// product depends on: a caller holding a stale in-memory copy of the
/// integration can update itself from here without re-reading storage.
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub outcomes: Vec<CalendarSyncOutcome>,
    /// Calendars that completed, in processing order.
    pub synced_calendar_ids: Vec<String>,
    /// The cursor map persisted at the end of the run.
    pub sync_tokens: BTreeMap<String, String>,
    /// Records written this run.
    pub upserted: Vec<EventRecord>,
    /// Uids deleted this run.
    pub removed_uids: Vec<EventUid>,
    /// Set when the run refreshed the access token.
    pub refreshed_token: Option<RefreshedToken>,
}

/// Run one sync for `user_id`.
pub fn sync_calendars(
    provider: &dyn CalendarProvider,
    store: &dyn SyncStore,
    user_id: &str,
    options: &SyncOptions,
) -> Result<SyncSummary, SyncError> {
    store.ensure_integration(user_id)?;
    let record = store.load_integration(user_id)?.ok_or_else(|| {
        StorageError::Corrupt("integration record missing after ensure".to_string())
    })?;

    if lease_held(&record, options.lease_ttl) {
        return Err(SyncError::SyncInProgress);
    }

    store.update_integration(user_id, IntegrationPatch::status(SyncStatus::Syncing, None))?;

    match run_sync(provider, store, user_id, record, options) {
        Ok(summary) => Ok(summary),
        Err(err) => {
            // Leave Error behind; if even that write fails, the original
            // error still wins.
            let status = IntegrationPatch::status(SyncStatus::Error, Some(err.to_string()));
            if let Err(status_err) = store.update_integration(user_id, status) {
                log::warn!(
                    "failed to record sync error for {}: {}",
                    user_id,
                    status_err
                );
            }
            Err(err)
        }
    }
}

fn lease_held(record: &IntegrationRecord, ttl: Duration) -> bool {
    record.last_sync_status == SyncStatus::Syncing && Utc::now() - record.updated_at < ttl
}

fn run_sync(
    provider: &dyn CalendarProvider,
    store: &dyn SyncStore,
    user_id: &str,
    record: IntegrationRecord,
    options: &SyncOptions,
) -> Result<SyncSummary, SyncError> {
    let mut summary = SyncSummary::default();

    let refresh_token = record
        .refresh_token
        .clone()
        .ok_or(SyncError::ReauthRequired)?;

    // Refresh the access token up front and persist it immediately, so
    // a failure later in the run doesn't lose it.
    let now_ms = Utc::now().timestamp_millis();
    let access_token = if record.token_needs_refresh(now_ms, TOKEN_EXPIRY_SLACK_MS) {
        let refreshed = provider.refresh_token(&refresh_token)?;
        store.update_integration(
            user_id,
            IntegrationPatch {
                access_token: Some(refreshed.access_token.clone()),
                expires_at: Some(refreshed.expires_at),
                scope: refreshed.scope.clone(),
                token_type: refreshed.token_type.clone(),
                ..IntegrationPatch::default()
            },
        )?;
        let token = refreshed.access_token.clone();
        summary.refreshed_token = Some(refreshed);
        token
    } else {
        record.access_token.clone().unwrap_or_default()
    };

    let window = resolve_window(options);

    let latest = provider.list_calendars(&access_token)?;
    let merged = merge_selection(&record.calendar_list, latest);
    let selected_ids: Vec<String> = merged
        .iter()
        .filter(|c| c.selected)
        .map(|c| c.id.clone())
        .collect();

    if selected_ids.is_empty() {
        // Persist the merged list so the UI can offer re-selection, and
        // drop every cursor: the next sync starts from scratch.
        store.update_integration(
            user_id,
            IntegrationPatch {
                calendar_list: Some(merged),
                sync_tokens: Some(BTreeMap::new()),
                ..IntegrationPatch::default()
            },
        )?;
        return Err(SyncError::NoCalendarsSelected);
    }

    // Cursors for deselected calendars are stale; drop them.
    let mut sync_tokens = record.sync_tokens.clone();
    sync_tokens.retain(|id, _| selected_ids.iter().any(|s| s == id));

    let mut upserts: Vec<EventRecord> = Vec::new();
    let mut removals: Vec<EventUid> = Vec::new();

    for calendar_id in &selected_ids {
        let cursor = if options.force_full_sync {
            None
        } else {
            sync_tokens.get(calendar_id).cloned()
        };

        match sync_one_calendar(
            provider,
            store,
            user_id,
            &access_token,
            calendar_id,
            cursor,
            &window,
            options.zone,
        ) {
            Ok((delta, next_token)) => {
                summary.outcomes.push(CalendarSyncOutcome::Synced {
                    calendar_id: calendar_id.clone(),
                    upserted: delta.upserts.len(),
                    removed: delta.removals.len(),
                    reset: delta.reset,
                });
                summary.synced_calendar_ids.push(calendar_id.clone());
                upserts.extend(delta.upserts);
                removals.extend(delta.removals);
                match next_token {
                    Some(token) => {
                        sync_tokens.insert(calendar_id.clone(), token);
                    }
                    None if delta.reset => {
                        sync_tokens.remove(calendar_id);
                    }
                    None => {}
                }
            }
            // Storage problems are not calendar-specific; bail out.
            Err(SyncError::Storage(err)) => return Err(err.into()),
            Err(err) => {
                log::warn!("calendar {} failed to sync: {}", calendar_id, err);
                summary.outcomes.push(CalendarSyncOutcome::Failed {
                    calendar_id: calendar_id.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    store.upsert_events(user_id, &upserts)?;
    store.remove_events(user_id, &removals)?;

    let first_error = summary.outcomes.iter().find_map(|o| match o {
        CalendarSyncOutcome::Failed { calendar_id, error } => {
            Some(format!("{}: {}", calendar_id, error))
        }
        _ => None,
    });
    let status = if first_error.is_some() {
        SyncStatus::Error
    } else {
        SyncStatus::Idle
    };

    store.update_integration(
        user_id,
        IntegrationPatch {
            calendar_list: Some(merged),
            sync_tokens: Some(sync_tokens.clone()),
            last_synced_at: Some(Utc::now()),
            last_sync_status: Some(status),
            last_sync_error: Some(first_error),
            ..IntegrationPatch::default()
        },
    )?;

    summary.sync_tokens = sync_tokens;
    summary.upserted = upserts;
    summary.removed_uids = removals;
    Ok(summary)
}

struct CalendarDelta {
    upserts: Vec<EventRecord>,
    removals: Vec<EventUid>,
    reset: bool,
}

#[allow(clippy::too_many_arguments)]
fn sync_one_calendar(
    provider: &dyn CalendarProvider,
    store: &dyn SyncStore,
    user_id: &str,
    access_token: &str,
    calendar_id: &str,
    cursor: Option<String>,
    window: &SyncWindow,
    zone: Tz,
) -> Result<(CalendarDelta, Option<String>), SyncError> {
    let windowed_mode = FetchMode::Windowed {
        time_min: window.time_min,
        time_max: window.time_max,
    };

    let mut windowed = cursor.is_none();
    let mut reset = false;

    let mut fetch = match cursor {
        Some(sync_token) => {
            provider.fetch_events(access_token, calendar_id, &FetchMode::Incremental { sync_token })?
        }
        None => provider.fetch_events(access_token, calendar_id, &windowed_mode)?,
    };

    if fetch.reset_required {
        // The provider invalidated the cursor (HTTP 410). The delta
        // stream is lost, so re-fetch the window and reconcile.
        log::info!("sync token for calendar {} invalidated, resyncing", calendar_id);
        reset = true;
        windowed = true;
        fetch = provider.fetch_events(access_token, calendar_id, &windowed_mode)?;
    }

    let upserts: Vec<EventRecord> = fetch
        .events
        .into_iter()
        .map(|raw| normalize_event(calendar_id, raw, zone))
        .collect();

    let removals: Vec<EventUid> = if windowed {
        // A windowed pass carries no trustworthy delete stream; remove
        // whatever we knew about that the provider no longer returns.
        let observed: BTreeSet<EventUid> = upserts.iter().map(|r| r.uid()).collect();
        store
            .list_event_uids_by_calendar(user_id, calendar_id)?
            .into_iter()
            .filter(|uid| !observed.contains(uid))
            .collect()
    } else {
        fetch
            .cancelled_ids
            .iter()
            .map(|event_id| EventUid::from_parts(calendar_id, event_id))
            .collect()
    };

    Ok((
        CalendarDelta {
            upserts,
            removals,
            reset,
        },
        fetch.next_sync_token,
    ))
}

fn resolve_window(options: &SyncOptions) -> SyncWindow {
    let default = SyncWindow::around(Utc::now().with_timezone(&options.zone));
    SyncWindow {
        time_min: options.time_min.unwrap_or(default.time_min),
        time_max: options.time_max.unwrap_or(default.time_max),
    }
}

/// Remove every imported event and wipe the integration back to its
/// empty state. The connect flow calls this when the user disconnects
/// the provider account; events are purged before the record so a
/// failure cannot orphan them.
pub fn disconnect_integration(
    store: &dyn SyncStore,
    user_id: &str,
) -> Result<(), StorageError> {
    if let Some(record) = store.load_integration(user_id)? {
        let mut calendar_ids: BTreeSet<String> = record
            .calendar_list
            .iter()
            .map(|c| c.id.clone())
            .collect();
        calendar_ids.extend(record.sync_tokens.keys().cloned());

        for calendar_id in calendar_ids {
            let uids = store.list_event_uids_by_calendar(user_id, &calendar_id)?;
            store.remove_events(user_id, &uids)?;
        }
    }
    store.update_integration(user_id, IntegrationPatch::reset())
}
