//! Call Executor
//!
//! Runs authorized API calls: gate check, bearer header injection, and a
//! single refresh-and-retry on 401.

use std::sync::Arc;
use url::Url;

use crate::core::{ApiRequest, ApiResponse, HttpTransport};
use crate::error::{error_description, AuthError, AuthResult, NetworkError};
use crate::refresh::{AuthorizationGate, RefreshCoordinator};
use crate::token::TokenStore;
use crate::types::{AuthConfig, TokenState};

/// Executor for API calls that require a valid access token.
pub struct CallExecutor<T: HttpTransport + 'static> {
    config: AuthConfig,
    transport: Arc<T>,
    store: TokenStore,
    gate: Arc<AuthorizationGate<T>>,
    coordinator: Arc<RefreshCoordinator<T>>,
}

impl<T: HttpTransport + 'static> CallExecutor<T> {
    /// Create new executor.
    pub fn new(
        config: AuthConfig,
        transport: Arc<T>,
        store: TokenStore,
        gate: Arc<AuthorizationGate<T>>,
        coordinator: Arc<RefreshCoordinator<T>>,
    ) -> Self {
        Self {
            config,
            transport,
            store,
            gate,
            coordinator,
        }
    }

    /// Execute an authorized API call.
    ///
    /// The gate runs first, so an expired token is refreshed before the call
    /// goes out. A 401 response still triggers one refresh-and-retry: the
    /// server may have revoked the token server-side ahead of its expiry.
    pub async fn api_call(&self, request: ApiRequest) -> AuthResult<ApiResponse> {
        self.gate.ensure_authorized().await?;
        let state = self.store.get().await?;

        let response = self.send_authorized(request.clone(), &state).await?;
        if response.status == 401 {
            tracing::warn!(url = %request.url, "request returned 401, refreshing and retrying");
            let state = self.coordinator.refresh().await?;
            let response = self.send_authorized(request, &state).await?;
            return into_result(response);
        }

        into_result(response)
    }

    async fn send_authorized(
        &self,
        mut request: ApiRequest,
        state: &TokenState,
    ) -> AuthResult<ApiResponse> {
        request.url = resolve_url(&self.config.api_base, &request.url)?;
        if let Some(token) = &state.access_token {
            request.headers.insert(
                "authorization".to_string(),
                format!("{} {}", state.token_type, token),
            );
        }
        self.transport.send(request).await
    }
}

/// Resolve a request URL against the API base, passing absolute URLs through.
fn resolve_url(api_base: &str, url: &str) -> AuthResult<String> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(url.to_string());
    }

    let base = Url::parse(api_base).map_err(|e| NetworkError::ConnectionFailed {
        message: format!("Invalid API base URL: {}", e),
    })?;
    let resolved = base.join(url).map_err(|e| NetworkError::ConnectionFailed {
        message: format!("Invalid request URL: {}", e),
    })?;
    Ok(resolved.to_string())
}

fn into_result(response: ApiResponse) -> AuthResult<ApiResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let value: serde_json::Value =
        serde_json::from_str(&response.body).unwrap_or(serde_json::Value::Null);
    let description =
        error_description(&value).unwrap_or_else(|| format!("HTTP {}", response.status));
    Err(AuthError::Api {
        status: response.status,
        description,
    })
}
