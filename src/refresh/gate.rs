//! Authorization Gate
//!
//! Decides whether a call may proceed: pass through on a valid token, wait
//! out a pause raised by another execution context, or trigger a refresh.

use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

use crate::core::HttpTransport;
use crate::error::{AuthError, AuthResult};
use crate::refresh::coordinator::RefreshCoordinator;
use crate::token::{RefreshLock, TokenStore};
use crate::types::AuthConfig;

/// Gate in front of authorized operations.
pub struct AuthorizationGate<T: HttpTransport + 'static> {
    config: AuthConfig,
    store: TokenStore,
    lock: Arc<RefreshLock>,
    coordinator: Arc<RefreshCoordinator<T>>,
}

impl<T: HttpTransport + 'static> AuthorizationGate<T> {
    /// Create new gate.
    pub fn new(
        config: AuthConfig,
        store: TokenStore,
        lock: Arc<RefreshLock>,
        coordinator: Arc<RefreshCoordinator<T>>,
    ) -> Self {
        Self {
            config,
            store,
            lock,
            coordinator,
        }
    }

    /// Ensure a usable access token is in the store when this returns.
    ///
    /// A valid token passes immediately. When paused, waits for the pause to
    /// drop and re-checks: another context may have refreshed meanwhile, in
    /// which case no exchange is needed here. Otherwise refreshes.
    pub async fn ensure_authorized(&self) -> AuthResult<()> {
        if self.store.is_valid().await? {
            return Ok(());
        }

        if self.lock.is_paused() {
            let lock = self.lock.clone();
            self.poll_until(move || {
                let lock = lock.clone();
                async move { Ok::<bool, AuthError>(!lock.is_paused()) }
            })
            .await?;

            if self.store.is_valid().await? {
                return Ok(());
            }
        }

        self.coordinator.refresh().await.map(|_| ())
    }

    /// Wait until the token becomes usable without triggering a refresh.
    ///
    /// This is the waiting side of cross-context coordination: some other
    /// context is expected to refresh and unpause.
    pub async fn refresh_polling(&self) -> AuthResult<()> {
        let lock = self.lock.clone();
        let store = self.store.clone();
        self.poll_until(move || {
            let lock = lock.clone();
            let store = store.clone();
            async move { Ok::<bool, AuthError>(!lock.is_paused() && store.is_valid().await?) }
        })
        .await
    }

    /// Wait until a caller-supplied condition holds, on the configured
    /// poll interval and release timeout.
    pub async fn refresh_polling_with<F, Fut>(&self, predicate: F) -> AuthResult<()>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = bool> + Send,
    {
        self.poll_until(move || {
            let fut = predicate();
            async move { Ok::<bool, AuthError>(fut.await) }
        })
        .await
    }

    async fn poll_until<F, Fut>(&self, predicate: F) -> AuthResult<()>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = AuthResult<bool>> + Send,
    {
        let deadline = Instant::now() + self.config.release_timeout;
        tracing::debug!(timeout = ?self.config.release_timeout, "entering poll-wait");
        loop {
            if predicate().await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                tracing::warn!("poll-wait ran past the release timeout");
                return Err(AuthError::Timeout);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
