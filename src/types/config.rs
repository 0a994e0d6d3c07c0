//! Configuration Types
//!
//! Token lifecycle client configuration.

use secrecy::SecretString;
use std::time::Duration;

/// Token lifecycle configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Token endpoint URL.
    pub token_endpoint: String,
    /// Token revocation endpoint URL (optional).
    pub revocation_endpoint: Option<String>,
    /// Base URL that relative API paths resolve against.
    pub api_base: String,
    /// Client credentials.
    pub credentials: ClientCredentials,
    /// How long a poll-wait may run before timing out.
    pub release_timeout: Duration,
    /// Interval between poll-wait checks.
    pub poll_interval: Duration,
    /// Delay applied before an automatic refresh exchange fires.
    pub refresh_delay: Duration,
    /// Assumed access token lifetime when none is supplied.
    pub access_token_ttl: Duration,
    /// HTTP timeout.
    pub http_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_endpoint: String::new(),
            revocation_endpoint: None,
            api_base: String::new(),
            credentials: ClientCredentials::default(),
            release_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(800),
            refresh_delay: Duration::from_millis(100),
            access_token_ttl: Duration::from_secs(3600),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_endpoint", &self.token_endpoint)
            .field("revocation_endpoint", &self.revocation_endpoint)
            .field("api_base", &self.api_base)
            .field("credentials", &self.credentials)
            .field("release_timeout", &self.release_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("refresh_delay", &self.refresh_delay)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

/// Client credentials for token endpoint authentication.
#[derive(Clone, Default)]
pub struct ClientCredentials {
    /// Client identifier.
    pub client_id: String,
    /// Client secret (for confidential clients).
    pub client_secret: Option<SecretString>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}
