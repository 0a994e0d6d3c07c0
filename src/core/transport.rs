//! HTTP Transport
//!
//! HTTP client interface and implementations.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::error::{AuthError, NetworkError};

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL, absolute or relative to the configured API base.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<String>,
}

impl ApiRequest {
    /// GET request with no headers or body.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// POST request with a body.
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: HashMap::new(),
            body: Some(body.into()),
        }
    }

    /// Add a header, consuming and returning the request.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: String,
}

impl ApiResponse {
    /// Any 2xx status counts as success, including non-standard codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AuthError>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
}

impl ReqwestHttpTransport {
    /// Create new transport with default settings.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create transport with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

impl Default for ReqwestHttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AuthError::Network(NetworkError::Timeout {
                    message: e.to_string(),
                })
            } else {
                AuthError::Network(NetworkError::ConnectionFailed {
                    message: e.to_string(),
                })
            }
        })?;

        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string().to_lowercase(), v.to_string());
            }
        }

        let body = response.text().await.map_err(|e| {
            AuthError::Network(NetworkError::ConnectionFailed {
                message: e.to_string(),
            })
        })?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// Mock HTTP transport for testing.
///
/// Responses are returned in queueing order so multi-request scenarios
/// (401, then refresh, then retry) can be scripted ahead of time.
#[derive(Default)]
pub struct MockHttpTransport {
    responses: std::sync::Mutex<VecDeque<ApiResponse>>,
    request_history: std::sync::Mutex<Vec<ApiRequest>>,
    default_response: std::sync::Mutex<Option<ApiResponse>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: ApiResponse) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response<T: serde::Serialize>(&self, status: u16, body: &T) -> &Self {
        let response = ApiResponse {
            status,
            headers: [("content-type".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body: serde_json::to_string(body).unwrap(),
        };
        self.queue_response(response)
    }

    /// Set default response when queue is empty.
    pub fn set_default_response(&self, response: ApiResponse) -> &Self {
        *self.default_response.lock().unwrap() = Some(response);
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<ApiRequest> {
        self.request_history.lock().unwrap().clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<ApiRequest> {
        self.request_history.lock().unwrap().last().cloned()
    }

    /// Number of requests seen so far.
    pub fn request_count(&self) -> usize {
        self.request_history.lock().unwrap().len()
    }

    /// Clear request history.
    pub fn clear_history(&self) {
        self.request_history.lock().unwrap().clear();
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        self.request_history.lock().unwrap().push(request);

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.default_response.lock().unwrap().clone());

        response.ok_or_else(|| {
            AuthError::Network(NetworkError::ConnectionFailed {
                message: "No mock response available".to_string(),
            })
        })
    }
}
