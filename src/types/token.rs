//! Token Types
//!
//! Token state and wire-format definitions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Persisted token state.
///
/// Every field is optional so the empty state (fresh install, cleared store)
/// and partially-populated states (access token cancelled, refresh token kept)
/// are all representable by the same struct.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenState {
    /// Access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token type (usually "bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Absolute expiration time of the access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenState {
    /// Empty state, nothing stored.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A state is usable when an access token is present and its expiry,
    /// if known, has not passed. An absent expiry counts as expired.
    pub fn is_valid(&self) -> bool {
        self.access_token.is_some()
            && self
                .expires_at
                .map(|exp| Utc::now() < exp)
                .unwrap_or(false)
    }

    /// Whether a refresh token is available for a refresh exchange.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Drop the access token, keeping the refresh token.
    pub fn without_access_token(mut self) -> Self {
        self.access_token = None;
        self.expires_at = None;
        self
    }
}

/// Success-shaped token endpoint response.
///
/// All fields are optional: a 2xx body missing mandatory fields must surface
/// as a malformed-response error, not as a deserialization failure.
#[derive(Clone, Debug, Deserialize)]
pub struct RawTokenResponse {
    /// Access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Token type.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl RawTokenResponse {
    /// Convert into a stored state, anchoring expiry at the current time.
    ///
    /// Returns `None` when the response lacks an access token or a lifetime.
    /// Providers may omit the refresh token on rotation, in which case the
    /// previously stored one is carried forward.
    pub fn into_state(self, previous_refresh: Option<String>) -> Option<TokenState> {
        let access_token = self.access_token?;
        let expires_in = self.expires_in?;

        Some(TokenState {
            access_token: Some(access_token),
            refresh_token: self.refresh_token.or(previous_refresh),
            token_type: self.token_type.unwrap_or_else(default_token_type),
            expires_at: Some(Utc::now() + Duration::seconds(expires_in as i64)),
        })
    }
}

/// Externally supplied token data, for injecting a token obtained elsewhere.
#[derive(Clone, Debug, Default)]
pub struct TokenInjection {
    /// Access token.
    pub access_token: String,
    /// Refresh token, kept from the current state when absent.
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, defaulted from configuration when absent.
    pub expires_in: Option<u64>,
    /// Token type.
    pub token_type: Option<String>,
}
