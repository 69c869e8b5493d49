//! Storage traits and implementations
//!
//! The sync engine never talks to a concrete store. Three backends share
//! the [`SyncStore`] contract: an in-memory store for trusted direct
//! sessions and tests, a SQLite store for privileged server-side use,
//! and a bearer-token REST store for runtimes without database bindings.

mod memory;
mod rest;
mod sqlite;
mod traits;

pub use memory::InMemorySyncStore;
pub use rest::{DocValue, RestSyncStore};
pub use sqlite::SqliteSyncStore;
pub use traits::{SyncStore, WRITE_CHUNK};
