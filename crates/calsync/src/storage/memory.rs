//! In-memory storage implementation
//!
//! Backs trusted direct end-user sessions and doubles as the test
//! store. HashMaps behind RwLocks, chunked writes like every other
//! backend so the commit-per-chunk contract is exercised uniformly.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::Utc;

use super::traits::{SyncStore, WRITE_CHUNK};
use crate::error::StorageError;
use crate::models::{EventRecord, EventUid, IntegrationPatch, IntegrationRecord};

/// In-memory implementation of [`SyncStore`].
pub struct InMemorySyncStore {
    integrations: RwLock<HashMap<String, IntegrationRecord>>,
    /// user id -> (event uid -> record); BTreeMap keeps listings ordered.
    events: RwLock<HashMap<String, BTreeMap<String, EventRecord>>>,
}

impl InMemorySyncStore {
    pub fn new() -> Self {
        Self {
            integrations: RwLock::new(HashMap::new()),
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Total stored events for a user, across calendars.
    pub fn count_events(&self, user_id: &str) -> usize {
        self.events
            .read()
            .unwrap()
            .get(user_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Snapshot a user's stored events, for diffing in tests.
    pub fn snapshot_events(&self, user_id: &str) -> BTreeMap<String, EventRecord> {
        self.events
            .read()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for InMemorySyncStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStore for InMemorySyncStore {
    fn load_integration(&self, user_id: &str) -> Result<Option<IntegrationRecord>, StorageError> {
        let integrations = self.integrations.read().unwrap();
        Ok(integrations.get(user_id).cloned())
    }

    fn ensure_integration(&self, user_id: &str) -> Result<(), StorageError> {
        let mut integrations = self.integrations.write().unwrap();
        integrations
            .entry(user_id.to_string())
            .or_insert_with(IntegrationRecord::empty);
        Ok(())
    }

    fn update_integration(
        &self,
        user_id: &str,
        patch: IntegrationPatch,
    ) -> Result<(), StorageError> {
        let mut integrations = self.integrations.write().unwrap();
        let record = integrations
            .entry(user_id.to_string())
            .or_insert_with(IntegrationRecord::empty);
        patch.apply(record);
        record.updated_at = Utc::now();
        Ok(())
    }

    fn upsert_events(&self, user_id: &str, events: &[EventRecord]) -> Result<(), StorageError> {
        for chunk in events.chunks(WRITE_CHUNK) {
            let mut store = self.events.write().unwrap();
            let user_events = store.entry(user_id.to_string()).or_default();
            for record in chunk {
                user_events.insert(record.uid().0.clone(), record.clone());
            }
        }
        Ok(())
    }

    fn remove_events(&self, user_id: &str, uids: &[EventUid]) -> Result<(), StorageError> {
        for chunk in uids.chunks(WRITE_CHUNK) {
            let mut store = self.events.write().unwrap();
            if let Some(user_events) = store.get_mut(user_id) {
                for uid in chunk {
                    user_events.remove(uid.as_str());
                }
            }
        }
        Ok(())
    }

    fn list_event_uids_by_calendar(
        &self,
        user_id: &str,
        calendar_id: &str,
    ) -> Result<Vec<EventUid>, StorageError> {
        let store = self.events.read().unwrap();
        let uids = store
            .get(user_id)
            .map(|user_events| {
                user_events
                    .values()
                    .filter(|record| record.calendar_id == calendar_id)
                    .map(|record| record.uid())
                    .collect()
            })
            .unwrap_or_default();
        Ok(uids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncStatus;
    use chrono::TimeZone;

    fn make_event(calendar_id: &str, event_id: &str) -> EventRecord {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        EventRecord {
            calendar_id: calendar_id.to_string(),
            event_id: event_id.to_string(),
            summary: format!("Event {}", event_id),
            description: None,
            location: None,
            start_date_key: "2024-06-01".to_string(),
            end_date_key: "2024-06-01".to_string(),
            start_ts: at.timestamp_millis(),
            end_ts: at.timestamp_millis() + 3_600_000,
            all_day: false,
            day_keys: vec!["2024-06-01".to_string()],
            month_keys: vec!["2024-06".to_string()],
            fiscal_year_keys: vec!["2024".to_string()],
            status: "confirmed".to_string(),
            start_raw: Default::default(),
            end_raw: Default::default(),
            organizer: None,
            color_id: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_ensure_is_create_if_absent() {
        let store = InMemorySyncStore::new();
        assert!(store.load_integration("u1").unwrap().is_none());

        store.ensure_integration("u1").unwrap();
        let record = store.load_integration("u1").unwrap().unwrap();
        assert!(record.access_token.is_none());

        // A second ensure must not clobber existing state.
        store
            .update_integration(
                "u1",
                IntegrationPatch {
                    access_token: Some("at".into()),
                    ..IntegrationPatch::default()
                },
            )
            .unwrap();
        store.ensure_integration("u1").unwrap();
        let record = store.load_integration("u1").unwrap().unwrap();
        assert_eq!(record.access_token.as_deref(), Some("at"));
    }

    #[test]
    fn test_update_stamps_updated_at() {
        let store = InMemorySyncStore::new();
        store.ensure_integration("u1").unwrap();
        let before = store.load_integration("u1").unwrap().unwrap().updated_at;

        store
            .update_integration("u1", IntegrationPatch::status(SyncStatus::Syncing, None))
            .unwrap();
        let record = store.load_integration("u1").unwrap().unwrap();
        assert_eq!(record.last_sync_status, SyncStatus::Syncing);
        assert!(record.updated_at >= before);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let store = InMemorySyncStore::new();
        let batch = vec![make_event("c1", "e1"), make_event("c1", "e2")];

        store.upsert_events("u1", &batch).unwrap();
        let first = store.snapshot_events("u1");
        store.upsert_events("u1", &batch).unwrap();
        let second = store.snapshot_events("u1");

        assert_eq!(first, second);
        assert_eq!(store.count_events("u1"), 2);
    }

    #[test]
    fn test_upsert_beyond_chunk_limit() {
        let store = InMemorySyncStore::new();
        let batch: Vec<EventRecord> = (0..WRITE_CHUNK + 50)
            .map(|i| make_event("c1", &format!("e{}", i)))
            .collect();

        store.upsert_events("u1", &batch).unwrap();
        assert_eq!(store.count_events("u1"), WRITE_CHUNK + 50);
    }

    #[test]
    fn test_remove_ignores_unknown_uids() {
        let store = InMemorySyncStore::new();
        store.upsert_events("u1", &[make_event("c1", "e1")]).unwrap();

        store
            .remove_events("u1", &[EventUid::new("c1__e1"), EventUid::new("c1__ghost")])
            .unwrap();
        assert_eq!(store.count_events("u1"), 0);
    }

    #[test]
    fn test_list_uids_filters_by_calendar() {
        let store = InMemorySyncStore::new();
        store
            .upsert_events(
                "u1",
                &[
                    make_event("c1", "e1"),
                    make_event("c1", "e2"),
                    make_event("c2", "e3"),
                ],
            )
            .unwrap();

        let uids = store.list_event_uids_by_calendar("u1", "c1").unwrap();
        assert_eq!(
            uids,
            vec![EventUid::new("c1__e1"), EventUid::new("c1__e2")]
        );
    }

    #[test]
    fn test_users_are_isolated() {
        let store = InMemorySyncStore::new();
        store.upsert_events("u1", &[make_event("c1", "e1")]).unwrap();
        assert_eq!(store.count_events("u2"), 0);
    }
}
