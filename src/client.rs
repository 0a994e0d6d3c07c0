//! Platform Client
//!
//! High-level facade combining the token store, refresh coordination and
//! authorized call execution.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::api::CallExecutor;
use crate::core::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, ReqwestHttpTransport};
use crate::error::AuthResult;
use crate::refresh::coordinator::{form_body, token_request_headers};
use crate::refresh::{AuthorizationGate, RefreshCoordinator, RefreshListener};
use crate::token::{InMemoryBackend, PersistenceBackend, RefreshLock, TokenStore};
use crate::types::{AuthConfig, TokenInjection, TokenState};

/// Client for the access-token lifecycle of one account.
pub struct Platform<T: HttpTransport + 'static = ReqwestHttpTransport> {
    config: AuthConfig,
    transport: Arc<T>,
    store: TokenStore,
    lock: Arc<RefreshLock>,
    coordinator: Arc<RefreshCoordinator<T>>,
    gate: Arc<AuthorizationGate<T>>,
    executor: CallExecutor<T>,
}

impl Platform<ReqwestHttpTransport> {
    /// Create a platform with the default transport and an in-memory backend.
    pub fn new(config: AuthConfig) -> Self {
        let transport = Arc::new(ReqwestHttpTransport::with_timeout(config.http_timeout));
        Self::with_components(config, transport, Arc::new(InMemoryBackend::new()))
    }
}

impl<T: HttpTransport + 'static> Platform<T> {
    /// Create a platform with injected transport and persistence backend.
    ///
    /// Two platforms sharing one backend model two execution contexts over
    /// the same persisted token.
    pub fn with_components(
        config: AuthConfig,
        transport: Arc<T>,
        backend: Arc<dyn PersistenceBackend>,
    ) -> Self {
        let store = TokenStore::new(backend);
        let lock = Arc::new(RefreshLock::new());
        let coordinator = Arc::new(RefreshCoordinator::new(
            config.clone(),
            transport.clone(),
            store.clone(),
        ));
        let gate = Arc::new(AuthorizationGate::new(
            config.clone(),
            store.clone(),
            lock.clone(),
            coordinator.clone(),
        ));
        let executor = CallExecutor::new(
            config.clone(),
            transport.clone(),
            store.clone(),
            gate.clone(),
            coordinator.clone(),
        );

        Self {
            config,
            transport,
            store,
            lock,
            coordinator,
            gate,
            executor,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Get the token store.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Register a listener for refresh settlements.
    pub fn subscribe(&self, listener: Arc<dyn RefreshListener>) {
        self.coordinator.subscribe(listener);
    }

    // ========== Token state ==========

    /// Read the current token state.
    pub async fn token(&self) -> AuthResult<TokenState> {
        self.store.get().await
    }

    /// Whether the stored access token is currently usable.
    pub async fn is_token_valid(&self) -> AuthResult<bool> {
        self.store.is_valid().await
    }

    /// Drop the access token while keeping the refresh token, forcing the
    /// next authorized operation through a refresh.
    pub async fn cancel_access_token(&self) -> AuthResult<()> {
        self.store.cancel_access().await
    }

    /// Inject a token obtained outside this client.
    ///
    /// The refresh token and lifetime fall back to the stored state and the
    /// configured default lifetime respectively.
    pub async fn set_token(&self, injection: TokenInjection) -> AuthResult<TokenState> {
        let current = self.store.get().await?;
        let expires_in = injection
            .expires_in
            .unwrap_or(self.config.access_token_ttl.as_secs());

        let state = TokenState {
            access_token: Some(injection.access_token),
            refresh_token: injection.refresh_token.or(current.refresh_token),
            token_type: injection
                .token_type
                .unwrap_or_else(|| "bearer".to_string()),
            expires_at: Some(Utc::now() + Duration::seconds(expires_in as i64)),
        };
        self.store.set(&state).await?;
        Ok(state)
    }

    // ========== Refresh coordination ==========

    /// Pause authorization checks while another context refreshes.
    pub fn pause(&self) {
        self.lock.pause();
    }

    /// Resume authorization checks.
    pub fn resume(&self) {
        self.lock.resume();
    }

    /// Whether authorization checks are currently paused.
    pub fn is_paused(&self) -> bool {
        self.lock.is_paused()
    }

    /// Refresh the stored token, joining an in-flight refresh if one exists.
    pub async fn refresh(&self) -> AuthResult<TokenState> {
        self.coordinator.refresh().await
    }

    /// Ensure a usable access token is in the store when this returns.
    pub async fn ensure_authorized(&self) -> AuthResult<()> {
        self.gate.ensure_authorized().await
    }

    /// Wait for another context to produce a usable token, without
    /// refreshing here.
    pub async fn refresh_polling(&self) -> AuthResult<()> {
        self.gate.refresh_polling().await
    }

    /// Wait until a caller-supplied condition holds.
    pub async fn refresh_polling_with<F, Fut>(&self, predicate: F) -> AuthResult<()>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: std::future::Future<Output = bool> + Send,
    {
        self.gate.refresh_polling_with(predicate).await
    }

    // ========== Session ==========

    /// Exchange username and password for a fresh token.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<TokenState> {
        self.coordinator.login(username, password).await
    }

    /// Revoke the current access token and clear the store.
    ///
    /// The store is cleared even when revocation fails; a revocation error
    /// still surfaces to the caller.
    pub async fn logout(&self) -> AuthResult<()> {
        let state = self.store.get().await?;

        let revocation = match (&self.config.revocation_endpoint, &state.access_token) {
            (Some(endpoint), Some(access_token)) => {
                let request = ApiRequest {
                    method: HttpMethod::Post,
                    url: endpoint.clone(),
                    headers: token_request_headers(&self.config.credentials),
                    body: Some(form_body(&[("token", access_token.as_str())])),
                };
                Some(self.transport.send(request).await)
            }
            _ => None,
        };

        self.store.clear().await?;

        match revocation {
            Some(Ok(response)) if !response.is_success() => {
                tracing::warn!(status = response.status, "token revocation rejected");
                Ok(())
            }
            Some(Err(error)) => Err(error),
            _ => Ok(()),
        }
    }

    // ========== API calls ==========

    /// Execute an authorized API call.
    pub async fn api_call(&self, request: ApiRequest) -> AuthResult<ApiResponse> {
        self.executor.api_call(request).await
    }

    /// Authorized GET against a path relative to the API base.
    pub async fn get(&self, path: &str) -> AuthResult<ApiResponse> {
        self.api_call(ApiRequest::get(path)).await
    }

    /// Authorized POST against a path relative to the API base.
    pub async fn post(&self, path: &str, body: impl Into<String>) -> AuthResult<ApiResponse> {
        self.api_call(ApiRequest::post(path, body)).await
    }
}
