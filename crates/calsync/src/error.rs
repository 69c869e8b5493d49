//! Error taxonomy for the calendar sync core
//!
//! Three layers: provider errors (Google Calendar API), storage errors
//! (any SyncStore backend), and the orchestrator-level SyncError that
//! callers match on to decide what to show the user.

use thiserror::Error;

/// Errors from provider (Google Calendar API) requests.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The access token was rejected (HTTP 401).
    #[error("provider rejected the access token")]
    AuthExpired,

    /// Any non-2xx response other than 401 and 410.
    #[error("provider returned HTTP {status}")]
    Api { status: u16 },

    /// Transport-level failure (DNS, TLS, connect, timeout).
    #[error("provider request failed: {0}")]
    Http(String),

    /// The response body did not match the expected shape.
    #[error("malformed provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Map a ureq error to the taxonomy. 410 is handled at the call site
    /// (sync-token invalidation is a recovery signal, not an error).
    pub(crate) fn from_request(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(401) => ProviderError::AuthExpired,
            ureq::Error::StatusCode(status) => ProviderError::Api { status },
            other => ProviderError::Http(other.to_string()),
        }
    }
}

/// Errors from any SyncStore backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Transport-level failure talking to the document API.
    #[error("document api request failed: {0}")]
    Request(String),

    /// Non-2xx response from the document API.
    #[error("document api returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// A stored record could not be decoded back into its model.
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

/// Orchestrator-level errors. Everything a caller of `sync_calendars`
/// can observe.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No refresh token is stored. The user must reconnect the calendar
    /// account; there is nothing to retry.
    #[error("calendar account must be reconnected")]
    ReauthRequired,

    /// The token endpoint rejected the refresh token. Treated exactly
    /// like [`SyncError::ReauthRequired`]; never retried.
    #[error("token refresh rejected: {0}")]
    TokenRefreshFailed(String),

    /// The merged calendar selection is empty. User-actionable: the
    /// merged list is persisted so the UI can offer re-selection.
    #[error("no calendars are selected for sync")]
    NoCalendarsSelected,

    /// Another run holds the advisory lease for this user.
    #[error("a sync for this user is already in flight")]
    SyncInProgress,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
