//! Storage trait definition

use crate::error::StorageError;
use crate::models::{EventRecord, EventUid, IntegrationPatch, IntegrationRecord};

/// Maximum documents per committed write group. Every backend splits
/// larger batches into chunks of this size and commits each chunk
/// before starting the next.
pub const WRITE_CHUNK: usize = 400;

/// Persistence boundary for calendar sync state.
///
/// All event writes are keyed by [`EventUid`], never by a generated id,
/// so `upsert_events` and `remove_events` are idempotent: replaying the
/// same batch converges to the same stored state.
pub trait SyncStore: Send + Sync {
    /// Load a user's integration record, if one exists.
    fn load_integration(&self, user_id: &str) -> Result<Option<IntegrationRecord>, StorageError>;

    /// Create an empty integration record if the user has none.
    fn ensure_integration(&self, user_id: &str) -> Result<(), StorageError>;

    /// Apply a partial update and stamp `updated_at`. Creates the
    /// record if absent, so a patch never silently vanishes.
    fn update_integration(
        &self,
        user_id: &str,
        patch: IntegrationPatch,
    ) -> Result<(), StorageError>;

    /// Insert or overwrite event records, chunked.
    fn upsert_events(&self, user_id: &str, events: &[EventRecord]) -> Result<(), StorageError>;

    /// Delete event records by uid, chunked. Unknown uids are ignored.
    fn remove_events(&self, user_id: &str, uids: &[EventUid]) -> Result<(), StorageError>;

    /// All stored event uids under one calendar, for reconciliation.
    fn list_event_uids_by_calendar(
        &self,
        user_id: &str,
        calendar_id: &str,
    ) -> Result<Vec<EventUid>, StorageError>;
}
