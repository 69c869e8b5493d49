//! Sync engine for pulling provider calendars into the store
//!
//! Provides the idempotent sync orchestrator, the pure selection-merge
//! step, and the scheduling decisions client hooks run on.

mod engine;
mod selection;
mod timing;

pub use engine::{
    CalendarSyncOutcome, SyncOptions, SyncSummary, disconnect_integration, sync_calendars,
};
pub use selection::merge_selection;
pub use timing::{AutoSyncAction, AutoSyncPolicy, SkipReason, cooldown_elapsed, decide_auto_sync};
