//! Domain models for calendar sync entities

mod event;
mod integration;

pub use event::{EventRecord, EventUid, RawEventTime};
pub use integration::{CalendarListEntry, IntegrationPatch, IntegrationRecord, SyncStatus};
