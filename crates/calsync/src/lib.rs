//! Calsync crate - Calendar synchronization core for Semestra
//!
//! This crate pulls a user's external (Google) calendars into the
//! product's own store and keeps them current:
//! - Token refresh and PKCE authorization-code exchange
//! - Incremental sync via per-calendar provider cursors, with automatic
//!   full-reconciliation recovery when a cursor is invalidated
//! - Normalization of raw events into records carrying day/month/
//!   fiscal-year index keys for the academic-calendar side
//! - A storage trait with three backends (in-memory, SQLite, bearer-token
//!   document REST API), all writing idempotent, chunked batches
//!
//! This crate has zero UI dependencies; the client hooks that schedule
//! sync runs live with the front end and consume [`sync::decide_auto_sync`]
//! and [`sync::sync_calendars`].

pub mod config;
pub mod error;
pub mod google;
pub mod models;
pub mod storage;
pub mod sync;
pub mod timekeys;

pub use config::ProviderCredentials;
pub use error::{ProviderError, StorageError, SyncError};
pub use google::{
    AuthHandshake, CalendarProvider, EventFetch, FetchMode, GoogleCalendarProvider, InitialTokens,
    RefreshedToken, normalize_event,
};
pub use models::{
    CalendarListEntry, EventRecord, EventUid, IntegrationPatch, IntegrationRecord, RawEventTime,
    SyncStatus,
};
pub use storage::{DocValue, InMemorySyncStore, RestSyncStore, SqliteSyncStore, SyncStore, WRITE_CHUNK};
pub use sync::{
    AutoSyncAction, AutoSyncPolicy, CalendarSyncOutcome, SkipReason, SyncOptions, SyncSummary,
    cooldown_elapsed, decide_auto_sync, disconnect_integration, merge_selection, sync_calendars,
};
pub use timekeys::SyncWindow;
