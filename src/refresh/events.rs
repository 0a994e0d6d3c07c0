//! Refresh Events
//!
//! Observer interface for refresh settlements.

use std::sync::Mutex;

use crate::error::AuthError;
use crate::types::TokenState;

/// Listener notified when a refresh settles.
///
/// Callbacks run on the task that drove the refresh to completion and must
/// not block.
pub trait RefreshListener: Send + Sync {
    /// A refresh completed and the store now holds the new state.
    fn on_refresh_success(&self, state: &TokenState);

    /// A refresh failed.
    fn on_refresh_error(&self, error: &AuthError);
}

/// Recording listener for testing.
#[derive(Default)]
pub struct RecordingRefreshListener {
    successes: Mutex<Vec<TokenState>>,
    errors: Mutex<Vec<AuthError>>,
}

impl RecordingRefreshListener {
    /// Create new recording listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of success events seen.
    pub fn success_count(&self) -> usize {
        self.successes.lock().unwrap().len()
    }

    /// Number of error events seen.
    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }

    /// Most recent successful state, if any.
    pub fn last_success(&self) -> Option<TokenState> {
        self.successes.lock().unwrap().last().cloned()
    }

    /// Most recent error, if any.
    pub fn last_error(&self) -> Option<AuthError> {
        self.errors.lock().unwrap().last().cloned()
    }
}

impl RefreshListener for RecordingRefreshListener {
    fn on_refresh_success(&self, state: &TokenState) {
        self.successes.lock().unwrap().push(state.clone());
    }

    fn on_refresh_error(&self, error: &AuthError) {
        self.errors.lock().unwrap().push(error.clone());
    }
}
