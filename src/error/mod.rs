//! Error Types
//!
//! Error hierarchy for the token lifecycle core.

use thiserror::Error;

/// Root error type for token lifecycle operations.
///
/// `Clone` is derived because a single refresh settlement fans out to every
/// coalesced waiter; each waiter receives an owned copy of the outcome.
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    /// A poll-wait ran past the release timeout without reaching a usable state.
    #[error("Automatic authentification timeout")]
    Timeout,

    /// A success-shaped token response was missing mandatory fields.
    #[error("Malformed OAuth response")]
    MalformedResponse {
        /// Raw response body, kept for diagnostics.
        raw: serde_json::Value,
    },

    /// The token endpoint rejected the exchange, or it could not be reached.
    #[error("{message}")]
    Refresh { message: String },

    /// An API call returned a non-2xx status.
    #[error("{description}")]
    Api { status: u16, description: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

/// Persistence backend failure. Propagated, never retried.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Corrupted data: {message}")]
    Corrupted { message: String },
}

/// Transport-level failure.
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout: {message}")]
    Timeout { message: String },
}

/// Result type for token lifecycle operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Extract the human-readable description from an OAuth-style error body.
///
/// Providers are inconsistent about which field carries the message, so the
/// lookup falls back through `message`, `error_description` and `description`.
pub fn error_description(body: &serde_json::Value) -> Option<String> {
    ["message", "error_description", "description"]
        .iter()
        .find_map(|key| body.get(key).and_then(|v| v.as_str()).map(str::to_string))
}
