//! OAuth2 token operations against the provider token endpoint
//!
//! Only the token exchange lives here; the consent popup and redirect
//! mechanics belong to the front end. The connect flow hands us an
//! authorization code plus the PKCE verifier it stored alongside the
//! `state` value, and the sync engine refreshes access tokens as they
//! expire.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{TOKEN_URL, api};
use crate::config::ProviderCredentials;
use crate::error::SyncError;

/// Fallback token lifetime when the endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// A fresh access token from a refresh-token exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Expiry instant, epoch milliseconds.
    pub expires_at: i64,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

/// The initial token set from an authorization-code exchange.
#[derive(Debug, Clone)]
pub struct InitialTokens {
    pub access_token: String,
    /// Absent when the provider declines to reissue one; the connect
    /// flow must then keep any previously stored refresh token.
    pub refresh_token: Option<String>,
    pub expires_at: i64,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

/// The `(state, code_verifier)` pairing the connect flow stores before
/// opening the consent popup. `state` round-trips through the provider
/// and is checked on return to reject mismatched or forged callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthHandshake {
    pub state: String,
    pub code_verifier: String,
}

impl AuthHandshake {
    /// Generate a new pairing. The verifier is 64 characters, within
    /// the 43..=128 range PKCE requires.
    pub fn generate() -> Self {
        Self {
            state: Uuid::new_v4().simple().to_string(),
            code_verifier: format!(
                "{}{}",
                Uuid::new_v4().simple(),
                Uuid::new_v4().simple()
            ),
        }
    }

    /// Check the `state` returned by the provider callback.
    pub fn matches_state(&self, returned_state: &str) -> bool {
        self.state == returned_state
    }
}

/// Exchange a refresh token for a fresh access token.
///
/// Any failure maps to [`SyncError::TokenRefreshFailed`]: a rejected
/// refresh token does not self-heal, so the caller surfaces "reconnect
/// your calendar" instead of retrying.
pub fn refresh_access_token(
    agent: &ureq::Agent,
    credentials: &ProviderCredentials,
    refresh_token: &str,
) -> Result<RefreshedToken, SyncError> {
    let response = agent
        .post(TOKEN_URL)
        .send_form([
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .map_err(|e| SyncError::TokenRefreshFailed(e.to_string()))?;

    let token: api::TokenResponse = response
        .into_body()
        .read_json()
        .map_err(|e| SyncError::TokenRefreshFailed(format!("invalid token response: {}", e)))?;

    Ok(RefreshedToken {
        access_token: token.access_token,
        expires_at: expires_at_ms(token.expires_in),
        scope: token.scope,
        token_type: token.token_type,
    })
}

/// Exchange an authorization code (plus its PKCE verifier) for the
/// initial token set.
pub fn exchange_authorization_code(
    agent: &ureq::Agent,
    credentials: &ProviderCredentials,
    code: &str,
    code_verifier: &str,
    redirect_uri: &str,
) -> Result<InitialTokens, SyncError> {
    let response = agent
        .post(TOKEN_URL)
        .send_form([
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ])
        .map_err(|e| SyncError::TokenRefreshFailed(e.to_string()))?;

    let token: api::TokenResponse = response
        .into_body()
        .read_json()
        .map_err(|e| SyncError::TokenRefreshFailed(format!("invalid token response: {}", e)))?;

    Ok(InitialTokens {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at: expires_at_ms(token.expires_in),
        scope: token.scope,
        token_type: token.token_type,
    })
}

fn expires_at_ms(expires_in: Option<u64>) -> i64 {
    let secs = expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    Utc::now().timestamp_millis() + (secs as i64) * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_verifier_length() {
        let handshake = AuthHandshake::generate();
        assert_eq!(handshake.code_verifier.len(), 64);
        assert!(handshake.code_verifier.len() >= 43);
        assert!(handshake.code_verifier.len() <= 128);
    }

    #[test]
    fn test_handshake_state_check() {
        let handshake = AuthHandshake::generate();
        assert!(handshake.matches_state(&handshake.state.clone()));
        assert!(!handshake.matches_state("forged"));
    }

    #[test]
    fn test_handshakes_are_unique() {
        let a = AuthHandshake::generate();
        let b = AuthHandshake::generate();
        assert_ne!(a.state, b.state);
        assert_ne!(a.code_verifier, b.code_verifier);
    }

    #[test]
    fn test_expires_at_default() {
        let before = Utc::now().timestamp_millis();
        let at = expires_at_ms(None);
        assert!(at >= before + 3600 * 1000);
    }

    #[test]
    fn test_token_response_parse() {
        let json = r#"{
            "access_token": "ya29.abc",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/calendar.readonly",
            "token_type": "Bearer"
        }"#;
        let token: api::TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "ya29.abc");
        assert_eq!(token.expires_in, Some(3599));
        assert!(token.refresh_token.is_none());
    }
}
