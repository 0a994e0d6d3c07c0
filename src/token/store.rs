//! Token Store
//!
//! Persistence backend interface and the store that projects a token state
//! onto it. The backend is the unit of sharing: two stores over the same
//! backend observe each other's writes, which is how separate execution
//! contexts (tabs, processes) coordinate.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{AuthResult, StorageError};
use crate::types::TokenState;

/// Well-known key under which the token state is persisted.
pub const TOKEN_STORAGE_KEY: &str = "oauth2-lifecycle/token";

/// Persistence backend interface (for dependency injection).
///
/// Values are opaque strings; the store layers JSON on top. Backend failures
/// propagate to the caller unchanged, they are never retried here.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Read the value for a key, `None` when absent.
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write the value for a key.
    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value for a key.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory persistence backend.
pub struct InMemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryBackend {
    /// Create new in-memory backend.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceBackend for InMemoryBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Mock persistence backend for testing.
#[derive(Default)]
pub struct MockBackend {
    entries: Mutex<HashMap<String, String>>,
    write_history: Mutex<Vec<(String, String)>>,
    read_history: Mutex<Vec<String>>,
    should_fail: Mutex<bool>,
}

impl MockBackend {
    /// Create new mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set backend to fail all operations.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Pre-populate an entry.
    pub fn add_entry(&self, key: &str, value: &str) -> &Self {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Get write history.
    pub fn get_write_history(&self) -> Vec<(String, String)> {
        self.write_history.lock().unwrap().clone()
    }

    /// Get read history.
    pub fn get_read_history(&self) -> Vec<String> {
        self.read_history.lock().unwrap().clone()
    }

    fn check_error(&self) -> Result<(), StorageError> {
        if *self.should_fail.lock().unwrap() {
            return Err(StorageError::ReadFailed {
                message: "Mock backend failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceBackend for MockBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_error()?;
        self.read_history.lock().unwrap().push(key.to_string());
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_error()?;
        self.write_history
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_error()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Token store over a persistence backend.
///
/// Holds no cached state: every read goes to the backend, so writes made
/// through another store over the same backend are always visible.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn PersistenceBackend>,
    key: String,
}

impl TokenStore {
    /// Create a store over a backend, using the well-known key.
    pub fn new(backend: Arc<dyn PersistenceBackend>) -> Self {
        Self {
            backend,
            key: TOKEN_STORAGE_KEY.to_string(),
        }
    }

    /// Read the current token state, empty when nothing is stored.
    pub async fn get(&self) -> AuthResult<TokenState> {
        let raw = self.backend.read(&self.key).await?;
        match raw {
            Some(json) => {
                let state =
                    serde_json::from_str(&json).map_err(|e| StorageError::Corrupted {
                        message: e.to_string(),
                    })?;
                Ok(state)
            }
            None => Ok(TokenState::empty()),
        }
    }

    /// Replace the stored token state.
    pub async fn set(&self, state: &TokenState) -> AuthResult<()> {
        let json = serde_json::to_string(state).map_err(|e| StorageError::WriteFailed {
            message: e.to_string(),
        })?;
        self.backend.write(&self.key, &json).await?;
        Ok(())
    }

    /// Drop the access token, keeping the refresh token.
    pub async fn cancel_access(&self) -> AuthResult<()> {
        let state = self.get().await?.without_access_token();
        self.set(&state).await
    }

    /// Reset to the empty state.
    pub async fn clear(&self) -> AuthResult<()> {
        self.set(&TokenState::empty()).await
    }

    /// Whether the stored access token is currently usable.
    pub async fn is_valid(&self) -> AuthResult<bool> {
        Ok(self.get().await?.is_valid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn valid_state() -> TokenState {
        TokenState {
            access_token: Some("ACCESS_TOKEN".to_string()),
            refresh_token: Some("REFRESH_TOKEN".to_string()),
            token_type: "bearer".to_string(),
            expires_at: Some(Utc::now() + Duration::seconds(3600)),
        }
    }

    #[tokio::test]
    async fn test_get_returns_empty_state_when_absent() {
        let store = TokenStore::new(Arc::new(InMemoryBackend::new()));
        let state = store.get().await.unwrap();
        assert!(state.access_token.is_none());
        assert!(!state.is_valid());
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let store = TokenStore::new(Arc::new(InMemoryBackend::new()));
        store.set(&valid_state()).await.unwrap();

        let state = store.get().await.unwrap();
        assert_eq!(state.access_token, Some("ACCESS_TOKEN".to_string()));
        assert!(store.is_valid().await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_access_keeps_refresh_token() {
        let store = TokenStore::new(Arc::new(InMemoryBackend::new()));
        store.set(&valid_state()).await.unwrap();
        store.cancel_access().await.unwrap();

        let state = store.get().await.unwrap();
        assert!(state.access_token.is_none());
        assert_eq!(state.refresh_token, Some("REFRESH_TOKEN".to_string()));
        assert!(!store.is_valid().await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let store = TokenStore::new(Arc::new(InMemoryBackend::new()));
        store.set(&valid_state()).await.unwrap();
        store.clear().await.unwrap();

        let state = store.get().await.unwrap();
        assert!(state.access_token.is_none());
        assert!(state.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_stores_over_shared_backend_observe_each_other() {
        let backend = Arc::new(InMemoryBackend::new());
        let first = TokenStore::new(backend.clone());
        let second = TokenStore::new(backend);

        first.set(&valid_state()).await.unwrap();
        assert!(second.is_valid().await.unwrap());

        second.clear().await.unwrap();
        assert!(!first.is_valid().await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupted_entry_surfaces_storage_error() {
        let backend = MockBackend::new();
        backend.add_entry(TOKEN_STORAGE_KEY, "not json");
        let store = TokenStore::new(Arc::new(backend));

        let result = store.get().await;
        assert!(matches!(
            result,
            Err(crate::error::AuthError::Storage(
                StorageError::Corrupted { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let backend = MockBackend::new();
        backend.set_should_fail(true);
        let store = TokenStore::new(Arc::new(backend));

        assert!(store.get().await.is_err());
    }
}
