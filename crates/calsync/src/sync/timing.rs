//! Auto-sync scheduling decisions
//!
//! Pure functions the client hooks run on. The hooks themselves are
//! consumers of the orchestrator and live with the UI; only the
//! decision logic is testable here.

use chrono::{DateTime, Duration, Utc};

use crate::models::{IntegrationRecord, SyncStatus};

/// Check if enough time has elapsed since the last sync to allow a new
/// one. Never-synced counts as elapsed.
pub fn cooldown_elapsed(last_synced_at: Option<DateTime<Utc>>, cooldown_secs: u64) -> bool {
    match last_synced_at {
        Some(last) => {
            let elapsed = Utc::now() - last;
            elapsed.num_seconds() >= cooldown_secs as i64
        }
        None => true,
    }
}

/// Scheduling policy for the auto-sync hook.
#[derive(Debug, Clone)]
pub struct AutoSyncPolicy {
    /// Minimum seconds between orchestrator runs.
    pub cooldown_secs: u64,
    /// How long a stored `Syncing` status is trusted before a new run
    /// may take over.
    pub lease_ttl: Duration,
}

impl Default for AutoSyncPolicy {
    fn default() -> Self {
        Self {
            cooldown_secs: 300,
            lease_ttl: Duration::minutes(10),
        }
    }
}

/// What the auto-sync hook should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSyncAction {
    /// First sync for this user: run a full windowed pass.
    FullSync,
    /// Normal run; each calendar resumes from its stored cursor.
    IncrementalSync,
    /// Do nothing right now.
    Skip(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No integration record, or no refresh token stored.
    NotConnected,
    /// Another run appears to be in flight.
    SyncInFlight,
    /// Within the cooldown window.
    CooldownActive,
}

/// Decide what the auto-sync hook should do for a user.
pub fn decide_auto_sync(
    record: Option<&IntegrationRecord>,
    policy: &AutoSyncPolicy,
) -> AutoSyncAction {
    let Some(record) = record else {
        return AutoSyncAction::Skip(SkipReason::NotConnected);
    };
    if record.refresh_token.is_none() {
        return AutoSyncAction::Skip(SkipReason::NotConnected);
    }

    if record.last_sync_status == SyncStatus::Syncing
        && Utc::now() - record.updated_at < policy.lease_ttl
    {
        return AutoSyncAction::Skip(SkipReason::SyncInFlight);
    }

    match record.last_synced_at {
        None => AutoSyncAction::FullSync,
        Some(_) if cooldown_elapsed(record.last_synced_at, policy.cooldown_secs) => {
            AutoSyncAction::IncrementalSync
        }
        Some(_) => AutoSyncAction::Skip(SkipReason::CooldownActive),
    }
}
