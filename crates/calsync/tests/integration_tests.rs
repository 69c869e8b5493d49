//! Integration tests for the calsync crate
//!
//! These drive the orchestrator end to end against a scripted provider
//! fake and the in-memory and SQLite stores.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use calsync::google::api;
use calsync::{
    CalendarListEntry, CalendarProvider, CalendarSyncOutcome, EventFetch, EventUid, FetchMode,
    InMemorySyncStore, IntegrationPatch, ProviderError, RefreshedToken, SqliteSyncStore,
    SyncError, SyncOptions, SyncStatus, SyncStore, disconnect_integration, sync_calendars,
};
use chrono::{Duration, Utc};
use tempfile::TempDir;

// ============================================================================
// Scripted provider fake
// ============================================================================

/// One scripted response for a calendar fetch.
enum FetchScript {
    Ok {
        events: Vec<api::RawEvent>,
        cancelled: Vec<&'static str>,
        next_sync_token: &'static str,
    },
    Reset,
    Fail(u16),
}

struct FakeProvider {
    refresh_result: Option<RefreshedToken>,
    calendars: Vec<CalendarListEntry>,
    scripts: Mutex<HashMap<String, VecDeque<FetchScript>>>,
    /// Ordered trace of provider calls, for sequencing assertions.
    op_log: Mutex<Vec<String>>,
}

impl FakeProvider {
    fn new(calendars: Vec<CalendarListEntry>) -> Self {
        Self {
            refresh_result: Some(RefreshedToken {
                access_token: "fresh-at".to_string(),
                expires_at: Utc::now().timestamp_millis() + 3_600_000,
                scope: None,
                token_type: Some("Bearer".to_string()),
            }),
            calendars,
            scripts: Mutex::new(HashMap::new()),
            op_log: Mutex::new(Vec::new()),
        }
    }

    fn script(mut self, calendar_id: &str, responses: Vec<FetchScript>) -> Self {
        self.scripts
            .get_mut()
            .unwrap()
            .insert(calendar_id.to_string(), responses.into());
        self
    }

    fn ops(&self) -> Vec<String> {
        self.op_log.lock().unwrap().clone()
    }
}

impl CalendarProvider for FakeProvider {
    fn refresh_token(&self, _refresh_token: &str) -> Result<RefreshedToken, SyncError> {
        self.op_log.lock().unwrap().push("refresh".to_string());
        self.refresh_result
            .clone()
            .ok_or_else(|| SyncError::TokenRefreshFailed("invalid_grant".to_string()))
    }

    fn list_calendars(&self, _access_token: &str) -> Result<Vec<CalendarListEntry>, ProviderError> {
        self.op_log.lock().unwrap().push("list".to_string());
        Ok(self.calendars.clone())
    }

    fn fetch_events(
        &self,
        _access_token: &str,
        calendar_id: &str,
        mode: &FetchMode,
    ) -> Result<EventFetch, ProviderError> {
        let kind = match mode {
            FetchMode::Incremental { .. } => "inc",
            FetchMode::Windowed { .. } => "win",
        };
        self.op_log
            .lock()
            .unwrap()
            .push(format!("fetch:{}:{}", calendar_id, kind));

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(calendar_id)
            .and_then(VecDeque::pop_front);

        match script {
            Some(FetchScript::Ok {
                events,
                cancelled,
                next_sync_token,
            }) => Ok(EventFetch {
                events,
                cancelled_ids: cancelled.iter().map(|s| s.to_string()).collect(),
                next_sync_token: Some(next_sync_token.to_string()),
                reset_required: false,
            }),
            Some(FetchScript::Reset) => Ok(EventFetch {
                reset_required: true,
                ..EventFetch::default()
            }),
            Some(FetchScript::Fail(status)) => Err(ProviderError::Api { status }),
            None => Ok(EventFetch {
                next_sync_token: Some("end".to_string()),
                ..EventFetch::default()
            }),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn calendar(id: &str) -> CalendarListEntry {
    CalendarListEntry {
        id: id.to_string(),
        summary: format!("Calendar {}", id),
        primary: id == "primary",
        access_role: "owner".to_string(),
        background_color: None,
        foreground_color: None,
        selected: true,
    }
}

fn raw_event(id: &str) -> api::RawEvent {
    api::RawEvent {
        id: Some(id.to_string()),
        status: Some("confirmed".to_string()),
        summary: Some(format!("Event {}", id)),
        description: None,
        location: None,
        start: Some(api::RawTime {
            date: None,
            date_time: Some("2024-06-01T09:00:00+09:00".to_string()),
            time_zone: Some("Asia/Tokyo".to_string()),
        }),
        end: Some(api::RawTime {
            date: None,
            date_time: Some("2024-06-01T10:00:00+09:00".to_string()),
            time_zone: Some("Asia/Tokyo".to_string()),
        }),
        organizer: None,
        color_id: None,
        created: None,
        updated: None,
    }
}

/// Seed a connected user with a refresh token and optional prior state.
fn seed_user(store: &dyn SyncStore, user_id: &str, patch: IntegrationPatch) {
    store.ensure_integration(user_id).unwrap();
    store
        .update_integration(
            user_id,
            IntegrationPatch {
                refresh_token: Some("rt1".to_string()),
                ..patch
            },
        )
        .unwrap();
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_first_sync_is_full_and_records_cursor() {
    let store = InMemorySyncStore::new();
    seed_user(&store, "u1", IntegrationPatch::default());

    let provider = FakeProvider::new(vec![calendar("cal1")]).script(
        "cal1",
        vec![FetchScript::Ok {
            events: vec![raw_event("e1"), raw_event("e2")],
            cancelled: vec![],
            next_sync_token: "cursor-1",
        }],
    );

    let summary =
        sync_calendars(&provider, &store, "u1", &SyncOptions::default()).unwrap();

    // No access token stored, so the refresh runs before anything else.
    let ops = provider.ops();
    assert_eq!(ops[0], "refresh");
    // First sync has no cursor: the fetch must be windowed, never token-driven.
    assert!(ops.contains(&"fetch:cal1:win".to_string()));
    assert!(!ops.iter().any(|op| op.ends_with(":inc")));

    let record = store.load_integration("u1").unwrap().unwrap();
    assert_eq!(record.sync_tokens.get("cal1").map(String::as_str), Some("cursor-1"));
    assert_eq!(record.last_sync_status, SyncStatus::Idle);
    assert!(record.last_sync_error.is_none());
    assert!(record.last_synced_at.is_some());
    assert_eq!(record.access_token.as_deref(), Some("fresh-at"));

    assert_eq!(summary.upserted.len(), 2);
    assert_eq!(summary.synced_calendar_ids, vec!["cal1"]);
    assert!(summary.refreshed_token.is_some());
    assert_eq!(store.count_events("u1"), 2);
}

#[test]
fn test_expired_token_refreshed_and_persisted_despite_failure() {
    let store = InMemorySyncStore::new();
    seed_user(
        &store,
        "u1",
        IntegrationPatch {
            access_token: Some("stale-at".to_string()),
            expires_at: Some(Utc::now().timestamp_millis() - 1000),
            ..IntegrationPatch::default()
        },
    );

    let provider = FakeProvider::new(vec![calendar("calA"), calendar("calB")])
        .script(
            "calA",
            vec![FetchScript::Ok {
                events: vec![raw_event("e1")],
                cancelled: vec![],
                next_sync_token: "tA",
            }],
        )
        .script("calB", vec![FetchScript::Fail(500)]);

    let summary =
        sync_calendars(&provider, &store, "u1", &SyncOptions::default()).unwrap();

    // The refresh ran before any calendar fetch.
    let ops = provider.ops();
    assert_eq!(ops[0], "refresh");
    assert!(ops.iter().position(|o| o == "refresh").unwrap()
        < ops.iter().position(|o| o.starts_with("fetch:")).unwrap());

    // The new token survived calB's failure.
    let record = store.load_integration("u1").unwrap().unwrap();
    assert_eq!(record.access_token.as_deref(), Some("fresh-at"));

    // calA completed, calB is isolated as a failed outcome.
    assert_eq!(summary.synced_calendar_ids, vec!["calA"]);
    assert_eq!(summary.outcomes.len(), 2);
    assert!(summary.outcomes[1].is_failed());
    assert_eq!(record.last_sync_status, SyncStatus::Error);
    assert!(record.last_sync_error.as_deref().unwrap().contains("calB"));

    // calA's data and cursor still landed.
    assert_eq!(record.sync_tokens.get("calA").map(String::as_str), Some("tA"));
    assert_eq!(store.count_events("u1"), 1);
}

#[test]
fn test_invalidated_cursor_triggers_reconciliation() {
    let store = InMemorySyncStore::new();

    let mut tokens = std::collections::BTreeMap::new();
    tokens.insert("cal1".to_string(), "stale-cursor".to_string());
    seed_user(
        &store,
        "u1",
        IntegrationPatch {
            access_token: Some("at".to_string()),
            expires_at: Some(Utc::now().timestamp_millis() + 3_600_000),
            sync_tokens: Some(tokens),
            ..IntegrationPatch::default()
        },
    );

    // Previously known events: e1 and e2.
    let provider_seed = FakeProvider::new(vec![calendar("cal1")]).script(
        "cal1",
        vec![FetchScript::Ok {
            events: vec![raw_event("e1"), raw_event("e2")],
            cancelled: vec![],
            next_sync_token: "stale-cursor",
        }],
    );
    sync_calendars(&provider_seed, &store, "u1", &SyncOptions::default()).unwrap();
    assert_eq!(store.count_events("u1"), 2);

    // The provider rejects the cursor; the windowed re-fetch only
    // returns e1, so e2 must be reconciled away.
    let provider = FakeProvider::new(vec![calendar("cal1")]).script(
        "cal1",
        vec![
            FetchScript::Reset,
            FetchScript::Ok {
                events: vec![raw_event("e1")],
                cancelled: vec![],
                next_sync_token: "fresh-cursor",
            },
        ],
    );

    let summary =
        sync_calendars(&provider, &store, "u1", &SyncOptions::default()).unwrap();

    let ops = provider.ops();
    assert!(ops.contains(&"fetch:cal1:inc".to_string()));
    assert!(ops.contains(&"fetch:cal1:win".to_string()));

    assert_eq!(summary.removed_uids, vec![EventUid::new("cal1__e2")]);
    assert!(matches!(
        summary.outcomes[0],
        CalendarSyncOutcome::Synced { reset: true, .. }
    ));

    let record = store.load_integration("u1").unwrap().unwrap();
    assert_eq!(
        record.sync_tokens.get("cal1").map(String::as_str),
        Some("fresh-cursor")
    );
    assert_eq!(store.count_events("u1"), 1);
    assert_eq!(
        store.list_event_uids_by_calendar("u1", "cal1").unwrap(),
        vec![EventUid::new("cal1__e1")]
    );
}

#[test]
fn test_incremental_cancellations_become_removals() {
    let store = InMemorySyncStore::new();

    let mut tokens = std::collections::BTreeMap::new();
    tokens.insert("cal1".to_string(), "cursor".to_string());
    seed_user(
        &store,
        "u1",
        IntegrationPatch {
            access_token: Some("at".to_string()),
            expires_at: Some(Utc::now().timestamp_millis() + 3_600_000),
            sync_tokens: Some(tokens),
            ..IntegrationPatch::default()
        },
    );
    store
        .upsert_events(
            "u1",
            &[calsync::normalize_event("cal1", raw_event("e9"), chrono_tz::UTC)],
        )
        .unwrap();

    let provider = FakeProvider::new(vec![calendar("cal1")]).script(
        "cal1",
        vec![FetchScript::Ok {
            events: vec![raw_event("e1")],
            cancelled: vec!["e9"],
            next_sync_token: "cursor-2",
        }],
    );

    let summary =
        sync_calendars(&provider, &store, "u1", &SyncOptions::default()).unwrap();

    assert_eq!(summary.removed_uids, vec![EventUid::new("cal1__e9")]);
    assert_eq!(
        store.list_event_uids_by_calendar("u1", "cal1").unwrap(),
        vec![EventUid::new("cal1__e1")]
    );
}

#[test]
fn test_empty_selection_fails_but_persists_list() {
    let store = InMemorySyncStore::new();

    // The user previously deselected cal1.
    let mut deselected = calendar("cal1");
    deselected.selected = false;
    seed_user(
        &store,
        "u1",
        IntegrationPatch {
            access_token: Some("at".to_string()),
            expires_at: Some(Utc::now().timestamp_millis() + 3_600_000),
            calendar_list: Some(vec![deselected]),
            ..IntegrationPatch::default()
        },
    );

    // The provider still reports cal1 as selected; the merge keeps the
    // user's deselection, leaving nothing to sync.
    let provider = FakeProvider::new(vec![calendar("cal1")]);

    let err = sync_calendars(&provider, &store, "u1", &SyncOptions::default()).unwrap_err();
    assert!(matches!(err, SyncError::NoCalendarsSelected));

    let record = store.load_integration("u1").unwrap().unwrap();
    assert_eq!(record.calendar_list.len(), 1);
    assert!(!record.calendar_list[0].selected);
    assert!(record.sync_tokens.is_empty());
    assert_eq!(record.last_sync_status, SyncStatus::Error);

    // Nothing was fetched.
    assert!(!provider.ops().iter().any(|op| op.starts_with("fetch:")));
}

#[test]
fn test_deselected_calendar_cursor_dropped_and_skipped() {
    let store = InMemorySyncStore::new();

    let mut deselected = calendar("c1");
    deselected.selected = false;
    let mut tokens = std::collections::BTreeMap::new();
    tokens.insert("c1".to_string(), "t1".to_string());
    tokens.insert("c2".to_string(), "t2".to_string());

    seed_user(
        &store,
        "u1",
        IntegrationPatch {
            access_token: Some("at".to_string()),
            expires_at: Some(Utc::now().timestamp_millis() + 3_600_000),
            calendar_list: Some(vec![deselected, calendar("c2")]),
            sync_tokens: Some(tokens),
            ..IntegrationPatch::default()
        },
    );

    let provider = FakeProvider::new(vec![calendar("c1"), calendar("c2")]).script(
        "c2",
        vec![FetchScript::Ok {
            events: vec![],
            cancelled: vec![],
            next_sync_token: "t2-next",
        }],
    );

    sync_calendars(&provider, &store, "u1", &SyncOptions::default()).unwrap();

    let ops = provider.ops();
    assert!(!ops.iter().any(|op| op.starts_with("fetch:c1")));
    assert!(ops.contains(&"fetch:c2:inc".to_string()));

    let record = store.load_integration("u1").unwrap().unwrap();
    assert!(record.sync_tokens.get("c1").is_none());
    assert_eq!(record.sync_tokens.get("c2").map(String::as_str), Some("t2-next"));
}

#[test]
fn test_missing_refresh_token_is_reauth() {
    let store = InMemorySyncStore::new();
    store.ensure_integration("u1").unwrap();

    let provider = FakeProvider::new(vec![calendar("cal1")]);
    let err = sync_calendars(&provider, &store, "u1", &SyncOptions::default()).unwrap_err();
    assert!(matches!(err, SyncError::ReauthRequired));

    // The failed run still released the status flag.
    let record = store.load_integration("u1").unwrap().unwrap();
    assert_eq!(record.last_sync_status, SyncStatus::Error);
}

#[test]
fn test_rejected_refresh_token_is_fatal() {
    let store = InMemorySyncStore::new();
    seed_user(&store, "u1", IntegrationPatch::default());

    let mut provider = FakeProvider::new(vec![calendar("cal1")]);
    provider.refresh_result = None;

    let err = sync_calendars(&provider, &store, "u1", &SyncOptions::default()).unwrap_err();
    assert!(matches!(err, SyncError::TokenRefreshFailed(_)));

    let record = store.load_integration("u1").unwrap().unwrap();
    assert_eq!(record.last_sync_status, SyncStatus::Error);
    // Nothing was fetched with a bad token.
    assert!(!provider.ops().iter().any(|op| op.starts_with("fetch:")));
}

#[test]
fn test_advisory_lease_blocks_concurrent_run() {
    let store = InMemorySyncStore::new();
    seed_user(
        &store,
        "u1",
        IntegrationPatch::status(SyncStatus::Syncing, None),
    );

    let provider = FakeProvider::new(vec![calendar("cal1")]);
    let err = sync_calendars(&provider, &store, "u1", &SyncOptions::default()).unwrap_err();
    assert!(matches!(err, SyncError::SyncInProgress));

    // A stale lease is treated as a crashed run and taken over.
    let options = SyncOptions {
        lease_ttl: Duration::zero(),
        ..SyncOptions::default()
    };
    assert!(sync_calendars(&provider, &store, "u1", &options).is_ok());
}

#[test]
fn test_force_full_sync_ignores_cursor() {
    let store = InMemorySyncStore::new();

    let mut tokens = std::collections::BTreeMap::new();
    tokens.insert("cal1".to_string(), "cursor".to_string());
    seed_user(
        &store,
        "u1",
        IntegrationPatch {
            access_token: Some("at".to_string()),
            expires_at: Some(Utc::now().timestamp_millis() + 3_600_000),
            sync_tokens: Some(tokens),
            ..IntegrationPatch::default()
        },
    );

    let provider = FakeProvider::new(vec![calendar("cal1")]).script(
        "cal1",
        vec![FetchScript::Ok {
            events: vec![raw_event("e1")],
            cancelled: vec![],
            next_sync_token: "cursor-2",
        }],
    );

    let options = SyncOptions {
        force_full_sync: true,
        ..SyncOptions::default()
    };
    sync_calendars(&provider, &store, "u1", &options).unwrap();

    let ops = provider.ops();
    assert!(ops.contains(&"fetch:cal1:win".to_string()));
    assert!(!ops.iter().any(|op| op.ends_with(":inc")));
}

#[test]
fn test_disconnect_purges_events_and_resets_record() {
    let store = InMemorySyncStore::new();
    seed_user(&store, "u1", IntegrationPatch::default());

    let provider = FakeProvider::new(vec![calendar("cal1")]).script(
        "cal1",
        vec![FetchScript::Ok {
            events: vec![raw_event("e1"), raw_event("e2")],
            cancelled: vec![],
            next_sync_token: "cursor",
        }],
    );
    sync_calendars(&provider, &store, "u1", &SyncOptions::default()).unwrap();
    assert_eq!(store.count_events("u1"), 2);

    disconnect_integration(&store, "u1").unwrap();

    assert_eq!(store.count_events("u1"), 0);
    let record = store.load_integration("u1").unwrap().unwrap();
    assert!(record.refresh_token.is_none());
    assert!(record.sync_tokens.is_empty());
    assert!(record.calendar_list.is_empty());
}

#[test]
fn test_full_sync_against_sqlite_store() {
    let dir = TempDir::new().unwrap();
    let store = SqliteSyncStore::new(dir.path().join("calsync.db")).unwrap();
    seed_user(&store, "u1", IntegrationPatch::default());

    let provider = FakeProvider::new(vec![calendar("cal1")]).script(
        "cal1",
        vec![FetchScript::Ok {
            events: vec![raw_event("e1"), raw_event("e2")],
            cancelled: vec![],
            next_sync_token: "cursor-1",
        }],
    );

    let summary =
        sync_calendars(&provider, &store, "u1", &SyncOptions::default()).unwrap();
    assert_eq!(summary.upserted.len(), 2);

    let record = store.load_integration("u1").unwrap().unwrap();
    assert_eq!(record.last_sync_status, SyncStatus::Idle);
    assert_eq!(
        record.sync_tokens.get("cal1").map(String::as_str),
        Some("cursor-1")
    );
    assert_eq!(
        store.list_event_uids_by_calendar("u1", "cal1").unwrap(),
        vec![EventUid::new("cal1__e1"), EventUid::new("cal1__e2")]
    );
}
