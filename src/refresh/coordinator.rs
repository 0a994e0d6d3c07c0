//! Refresh Coordinator
//!
//! Single-flight refresh exchange against the token endpoint. Concurrent
//! refresh requests within one process coalesce onto a shared in-flight
//! future and all observe the same settlement.

use base64::Engine;
use futures::future::{BoxFuture, FutureExt, Shared};
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::core::{ApiRequest, ApiResponse, HttpMethod, HttpTransport};
use crate::error::{error_description, AuthError, AuthResult};
use crate::refresh::events::RefreshListener;
use crate::token::TokenStore;
use crate::types::{AuthConfig, ClientCredentials, RawTokenResponse, TokenState};

type SharedRefresh = Shared<BoxFuture<'static, Result<TokenState, AuthError>>>;

/// Coordinates refresh exchanges over one store and transport.
pub struct RefreshCoordinator<T: HttpTransport + 'static> {
    config: AuthConfig,
    transport: Arc<T>,
    store: TokenStore,
    listeners: Arc<Mutex<Vec<Arc<dyn RefreshListener>>>>,
    inflight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl<T: HttpTransport + 'static> RefreshCoordinator<T> {
    /// Create new coordinator.
    pub fn new(config: AuthConfig, transport: Arc<T>, store: TokenStore) -> Self {
        Self {
            config,
            transport,
            store,
            listeners: Arc::new(Mutex::new(Vec::new())),
            inflight: Arc::new(Mutex::new(None)),
        }
    }

    /// Register a listener for refresh settlements.
    pub fn subscribe(&self, listener: Arc<dyn RefreshListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    /// Refresh the stored token, joining an in-flight refresh if one exists.
    ///
    /// The in-flight slot is cleared when the exchange settles, so a refresh
    /// requested after settlement starts a new exchange rather than observing
    /// a stale result.
    pub async fn refresh(&self) -> AuthResult<TokenState> {
        let shared = {
            let mut slot = self.inflight.lock().unwrap();
            match slot.as_ref() {
                Some(existing) => {
                    tracing::debug!("joining in-flight token refresh");
                    existing.clone()
                }
                None => {
                    tracing::debug!("starting token refresh");
                    let fut = Self::run_refresh(
                        self.config.clone(),
                        self.transport.clone(),
                        self.store.clone(),
                        self.listeners.clone(),
                        self.inflight.clone(),
                    )
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        shared.await
    }

    /// Exchange username and password for a fresh token.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<TokenState> {
        let body = form_body(&[
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ]);
        let response = self.send_token_request(body).await?;

        if !response.is_success() {
            return Err(exchange_failure(response.status, &response.body));
        }

        let state = parse_token_response(&response.body, None)?;
        self.store.set(&state).await?;
        Ok(state)
    }

    async fn send_token_request(&self, body: String) -> AuthResult<ApiResponse> {
        let request = ApiRequest {
            method: HttpMethod::Post,
            url: self.config.token_endpoint.clone(),
            headers: token_request_headers(&self.config.credentials),
            body: Some(body),
        };
        self.transport.send(request).await
    }

    async fn run_refresh(
        config: AuthConfig,
        transport: Arc<T>,
        store: TokenStore,
        listeners: Arc<Mutex<Vec<Arc<dyn RefreshListener>>>>,
        inflight: Arc<Mutex<Option<SharedRefresh>>>,
    ) -> AuthResult<TokenState> {
        if !config.refresh_delay.is_zero() {
            tokio::time::sleep(config.refresh_delay).await;
        }

        let result = Self::exchange_refresh(&config, transport.as_ref(), &store).await;

        // Clear the slot before fanning out, so listeners that trigger a new
        // refresh start a fresh exchange.
        inflight.lock().unwrap().take();

        let subscribers: Vec<_> = listeners.lock().unwrap().clone();
        match &result {
            Ok(state) => {
                tracing::debug!("token refresh succeeded");
                for listener in &subscribers {
                    listener.on_refresh_success(state);
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "token refresh failed");
                for listener in &subscribers {
                    listener.on_refresh_error(error);
                }
            }
        }

        result
    }

    async fn exchange_refresh(
        config: &AuthConfig,
        transport: &T,
        store: &TokenStore,
    ) -> AuthResult<TokenState> {
        let current = store.get().await?;
        let refresh_token = current.refresh_token.ok_or_else(|| AuthError::Refresh {
            message: "No refresh token available".to_string(),
        })?;

        let body = form_body(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", &refresh_token),
        ]);
        let request = ApiRequest {
            method: HttpMethod::Post,
            url: config.token_endpoint.clone(),
            headers: token_request_headers(&config.credentials),
            body: Some(body),
        };

        let response = match transport.send(request).await {
            Ok(response) => response,
            Err(error) => {
                store.clear().await?;
                return Err(AuthError::Refresh {
                    message: error.to_string(),
                });
            }
        };

        if !response.is_success() {
            store.clear().await?;
            return Err(exchange_failure(response.status, &response.body));
        }

        // A malformed success body leaves the store untouched; the old
        // refresh token may still work on a later attempt.
        let state = parse_token_response(&response.body, Some(refresh_token))?;
        store.set(&state).await?;
        Ok(state)
    }
}

/// Parse a success-shaped token endpoint body into a stored state.
fn parse_token_response(
    body: &str,
    previous_refresh: Option<String>,
) -> AuthResult<TokenState> {
    let value: serde_json::Value =
        serde_json::from_str(body).unwrap_or(serde_json::Value::Null);
    let raw: RawTokenResponse = serde_json::from_value(value.clone())
        .map_err(|_| AuthError::MalformedResponse { raw: value.clone() })?;

    raw.into_state(previous_refresh)
        .ok_or(AuthError::MalformedResponse { raw: value })
}

/// Map a rejected token exchange to an error carrying the provider's message.
fn exchange_failure(status: u16, body: &str) -> AuthError {
    let value: serde_json::Value =
        serde_json::from_str(body).unwrap_or(serde_json::Value::Null);
    let message =
        error_description(&value).unwrap_or_else(|| format!("HTTP {}", status));
    AuthError::Refresh { message }
}

/// Encode form parameters as an x-www-form-urlencoded body.
pub(crate) fn form_body(pairs: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Headers for token endpoint requests, with Basic auth when a client
/// secret is configured.
pub(crate) fn token_request_headers(
    credentials: &ClientCredentials,
) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert(
        "content-type".to_string(),
        "application/x-www-form-urlencoded".to_string(),
    );
    headers.insert("accept".to_string(), "application/json".to_string());

    if let Some(secret) = &credentials.client_secret {
        let raw = format!("{}:{}", credentials.client_id, secret.expose_secret());
        let encoded = base64::engine::general_purpose::STANDARD.encode(raw);
        headers.insert("authorization".to_string(), format!("Basic {}", encoded));
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MockHttpTransport;
    use crate::refresh::events::RecordingRefreshListener;
    use crate::token::InMemoryBackend;
    use chrono::{Duration, Utc};
    use secrecy::SecretString;
    use serde_json::json;

    fn test_config() -> AuthConfig {
        AuthConfig {
            token_endpoint: "https://provider.example.com/oauth/token".to_string(),
            api_base: "https://platform.example.com".to_string(),
            credentials: ClientCredentials {
                client_id: "whatever".to_string(),
                client_secret: Some(SecretString::new("whatever-secret".to_string())),
            },
            refresh_delay: std::time::Duration::ZERO,
            ..AuthConfig::default()
        }
    }

    fn seeded_store() -> TokenStore {
        TokenStore::new(Arc::new(InMemoryBackend::new()))
    }

    async fn seed(store: &TokenStore, valid: bool) {
        let expires_at = if valid {
            Utc::now() + Duration::seconds(3600)
        } else {
            Utc::now() - Duration::seconds(1)
        };
        store
            .set(&TokenState {
                access_token: Some("ACCESS_TOKEN".to_string()),
                refresh_token: Some("REFRESH_TOKEN".to_string()),
                token_type: "bearer".to_string(),
                expires_at: Some(expires_at),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_refresh_updates_store() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(
            200,
            &json!({
                "access_token": "ACCESS_TOKEN_FROM_REFRESH",
                "refresh_token": "REFRESH_TOKEN_FROM_REFRESH",
                "expires_in": 3600
            }),
        );
        let store = seeded_store();
        seed(&store, false).await;

        let coordinator = RefreshCoordinator::new(test_config(), transport.clone(), store.clone());
        let state = coordinator.refresh().await.unwrap();

        assert_eq!(
            state.access_token,
            Some("ACCESS_TOKEN_FROM_REFRESH".to_string())
        );
        assert!(store.is_valid().await.unwrap());

        let request = transport.get_last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert!(request
            .body
            .as_deref()
            .unwrap()
            .contains("grant_type=refresh_token"));
        assert!(request.headers["authorization"].starts_with("Basic "));
    }

    #[tokio::test]
    async fn test_refresh_preserves_refresh_token_when_absent() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(
            200,
            &json!({"access_token": "ACCESS_TOKEN_FROM_REFRESH", "expires_in": 3600}),
        );
        let store = seeded_store();
        seed(&store, false).await;

        let coordinator = RefreshCoordinator::new(test_config(), transport, store.clone());
        coordinator.refresh().await.unwrap();

        let state = store.get().await.unwrap();
        assert_eq!(state.refresh_token, Some("REFRESH_TOKEN".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails_fast() {
        let transport = Arc::new(MockHttpTransport::new());
        let store = seeded_store();

        let coordinator = RefreshCoordinator::new(test_config(), transport.clone(), store);
        let error = coordinator.refresh().await.unwrap_err();

        assert_eq!(error.to_string(), "No refresh token available");
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_refresh_kills_token_and_surfaces_message() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(400, &json!({"message": "Wrong token"}));
        let store = seeded_store();
        seed(&store, true).await;

        let coordinator = RefreshCoordinator::new(test_config(), transport, store.clone());
        let error = coordinator.refresh().await.unwrap_err();

        assert_eq!(error.to_string(), "Wrong token");
        let state = store.get().await.unwrap();
        assert!(state.access_token.is_none());
        assert!(state.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_malformed_success_body_leaves_store_untouched() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(240, &json!({"message": "time not in sync"}));
        let store = seeded_store();
        seed(&store, false).await;

        let listener = Arc::new(RecordingRefreshListener::new());
        let coordinator = RefreshCoordinator::new(test_config(), transport, store.clone());
        coordinator.subscribe(listener.clone());

        let error = coordinator.refresh().await.unwrap_err();
        assert!(matches!(error, AuthError::MalformedResponse { .. }));
        assert_eq!(error.to_string(), "Malformed OAuth response");

        let state = store.get().await.unwrap();
        assert_eq!(state.refresh_token, Some("REFRESH_TOKEN".to_string()));
        assert_eq!(listener.error_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_coalesce() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(
            200,
            &json!({
                "access_token": "ACCESS_TOKEN_FROM_REFRESH",
                "refresh_token": "REFRESH_TOKEN_FROM_REFRESH",
                "expires_in": 3600
            }),
        );
        let store = seeded_store();
        seed(&store, false).await;

        // A small delay keeps the exchange in flight while the other two
        // callers join it.
        let config = AuthConfig {
            refresh_delay: std::time::Duration::from_millis(10),
            ..test_config()
        };
        let listener = Arc::new(RecordingRefreshListener::new());
        let coordinator = Arc::new(RefreshCoordinator::new(config, transport.clone(), store));
        coordinator.subscribe(listener.clone());

        let (a, b, c) = tokio::join!(
            coordinator.refresh(),
            coordinator.refresh(),
            coordinator.refresh()
        );

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(transport.request_count(), 1);
        assert_eq!(listener.success_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_after_settlement_starts_new_exchange() {
        let transport = Arc::new(MockHttpTransport::new());
        for _ in 0..2 {
            transport.queue_json_response(
                200,
                &json!({
                    "access_token": "ACCESS_TOKEN_FROM_REFRESH",
                    "refresh_token": "REFRESH_TOKEN_FROM_REFRESH",
                    "expires_in": 3600
                }),
            );
        }
        let store = seeded_store();
        seed(&store, false).await;

        let coordinator = RefreshCoordinator::new(test_config(), transport.clone(), store);
        coordinator.refresh().await.unwrap();
        coordinator.refresh().await.unwrap();

        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_login_stores_token_without_refresh_events() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(
            200,
            &json!({
                "access_token": "ACCESS_TOKEN",
                "refresh_token": "REFRESH_TOKEN",
                "expires_in": 3600
            }),
        );
        let store = seeded_store();

        let listener = Arc::new(RecordingRefreshListener::new());
        let coordinator = RefreshCoordinator::new(test_config(), transport.clone(), store.clone());
        coordinator.subscribe(listener.clone());

        let state = coordinator.login("whatever@example.com", "whatever-password").await.unwrap();
        assert!(state.is_valid());
        assert!(store.is_valid().await.unwrap());
        assert_eq!(listener.success_count(), 0);

        let request = transport.get_last_request().unwrap();
        assert!(request
            .body
            .as_deref()
            .unwrap()
            .contains("grant_type=password"));
    }

    #[test]
    fn test_form_body_encodes_pairs() {
        let body = form_body(&[("grant_type", "password"), ("username", "a b@c")]);
        assert_eq!(body, "grant_type=password&username=a+b%40c");
    }

    #[test]
    fn test_headers_without_secret_skip_basic_auth() {
        let headers = token_request_headers(&ClientCredentials {
            client_id: "whatever".to_string(),
            client_secret: None,
        });
        assert!(!headers.contains_key("authorization"));
        assert_eq!(headers["accept"], "application/json");
    }
}
