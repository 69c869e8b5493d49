//! Google Calendar API integration
//!
//! This module provides:
//! - Token refresh and authorization-code exchange (PKCE)
//! - Calendar list and event fetching with incremental sync cursors
//! - Normalization of raw provider events to domain records
//!
//! All HTTP is synchronous (ureq) to stay executor-agnostic.

mod calendars;
mod events;
mod normalize;
mod token;

use std::time::Duration;

pub use calendars::fetch_calendar_list;
pub use events::{EventFetch, FetchMode, fetch_events};
pub use normalize::normalize_event;
pub use token::{
    AuthHandshake, InitialTokens, RefreshedToken, exchange_authorization_code,
    refresh_access_token,
};

use crate::config::ProviderCredentials;
use crate::error::{ProviderError, SyncError};
use crate::models::CalendarListEntry;

/// Google OAuth2 token endpoint.
pub(crate) const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google Calendar API v3 base URL.
pub(crate) const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// The provider seam the orchestrator runs against.
///
/// [`GoogleCalendarProvider`] is the production implementation; tests
/// drive the orchestrator with a scripted fake.
pub trait CalendarProvider {
    /// Exchange a refresh token for a fresh access token.
    fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedToken, SyncError>;

    /// Fetch all calendars the user can at least read.
    fn list_calendars(&self, access_token: &str) -> Result<Vec<CalendarListEntry>, ProviderError>;

    /// Fetch one calendar's events, incrementally or windowed.
    fn fetch_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        mode: &FetchMode,
    ) -> Result<EventFetch, ProviderError>;
}

/// Google Calendar API client.
pub struct GoogleCalendarProvider {
    agent: ureq::Agent,
    credentials: ProviderCredentials,
}

impl GoogleCalendarProvider {
    /// Default global timeout applied to every provider request.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(credentials: ProviderCredentials) -> Self {
        Self::with_timeout(credentials, Self::DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit request timeout.
    pub fn with_timeout(credentials: ProviderCredentials, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent, credentials }
    }

    /// Run the PKCE authorization-code exchange for the connect flow.
    pub fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<InitialTokens, SyncError> {
        exchange_authorization_code(&self.agent, &self.credentials, code, code_verifier, redirect_uri)
    }
}

impl CalendarProvider for GoogleCalendarProvider {
    fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedToken, SyncError> {
        refresh_access_token(&self.agent, &self.credentials, refresh_token)
    }

    fn list_calendars(&self, access_token: &str) -> Result<Vec<CalendarListEntry>, ProviderError> {
        fetch_calendar_list(&self.agent, access_token)
    }

    fn fetch_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        mode: &FetchMode,
    ) -> Result<EventFetch, ProviderError> {
        fetch_events(&self.agent, access_token, calendar_id, mode)
    }
}

/// Google Calendar API response types
pub mod api {
    use serde::Deserialize;

    /// Response from the token endpoint.
    #[derive(Debug, Deserialize)]
    pub struct TokenResponse {
        pub access_token: String,
        pub expires_in: Option<u64>,
        pub refresh_token: Option<String>,
        pub scope: Option<String>,
        pub token_type: Option<String>,
    }

    /// Response from listing the user's calendars.
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CalendarListResponse {
        #[serde(default)]
        pub items: Vec<CalendarListItem>,
        pub next_page_token: Option<String>,
    }

    /// One calendar from the calendar list.
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CalendarListItem {
        pub id: Option<String>,
        pub summary: Option<String>,
        pub primary: Option<bool>,
        pub access_role: Option<String>,
        pub background_color: Option<String>,
        pub foreground_color: Option<String>,
        pub selected: Option<bool>,
    }

    /// Response from listing a calendar's events.
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct EventsResponse {
        #[serde(default)]
        pub items: Vec<RawEvent>,
        pub next_page_token: Option<String>,
        pub next_sync_token: Option<String>,
    }

    /// A raw provider event, before normalization.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RawEvent {
        pub id: Option<String>,
        pub status: Option<String>,
        pub summary: Option<String>,
        pub description: Option<String>,
        pub location: Option<String>,
        pub start: Option<RawTime>,
        pub end: Option<RawTime>,
        pub organizer: Option<RawOrganizer>,
        pub color_id: Option<String>,
        pub created: Option<String>,
        pub updated: Option<String>,
    }

    /// Start or end of a raw event: `date` for all-day, `dateTime` for
    /// timed, optional IANA `timeZone`.
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RawTime {
        pub date: Option<String>,
        pub date_time: Option<String>,
        pub time_zone: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RawOrganizer {
        pub email: Option<String>,
        pub display_name: Option<String>,
    }
}
