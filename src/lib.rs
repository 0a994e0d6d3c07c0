//! OAuth2 Token Lifecycle
//!
//! Client-side access-token lifecycle management: persisted token state,
//! single-flight refresh with coalescing, cross-context pause/poll
//! coordination, and authorized API calls with one refresh-and-retry on 401.
//!
//! # Example
//!
//! ```rust,ignore
//! use oauth2_lifecycle::{AuthConfig, ClientCredentials, Platform};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig {
//!         token_endpoint: "https://provider.example.com/oauth/token".to_string(),
//!         api_base: "https://platform.example.com/v1/".to_string(),
//!         credentials: ClientCredentials {
//!             client_id: "my-client-id".to_string(),
//!             client_secret: None,
//!         },
//!         ..AuthConfig::default()
//!     };
//!
//!     let platform = Platform::new(config);
//!     platform.login("user@example.com", "password").await?;
//!
//!     let response = platform.get("account/info").await?;
//!     println!("{}", response.body);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several sub-modules:
//!
//! - `types`: token state, wire formats and configuration
//! - `error`: error hierarchy
//! - `core`: HTTP transport abstraction
//! - `token`: persistence backends, the token store and the refresh lock
//! - `refresh`: single-flight coordinator, authorization gate, events
//! - `api`: authorized call execution
//! - `client`: high-level platform facade combining all of the above

pub mod api;
pub mod client;
pub mod core;
pub mod error;
pub mod refresh;
pub mod token;
pub mod types;

// Re-export main client
pub use client::Platform;

// Re-export errors
pub use error::{error_description, AuthError, AuthResult, NetworkError, StorageError};

// Re-export types
pub use types::{AuthConfig, ClientCredentials, RawTokenResponse, TokenInjection, TokenState};

// Re-export core components
pub use core::{
    ApiRequest, ApiResponse, HttpMethod, HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};

// Re-export token management
pub use token::{
    InMemoryBackend, MockBackend, PersistenceBackend, RefreshLock, TokenStore, TOKEN_STORAGE_KEY,
};

// Re-export refresh coordination
pub use refresh::{
    AuthorizationGate, RecordingRefreshListener, RefreshCoordinator, RefreshListener,
};

// Re-export API execution
pub use api::CallExecutor;
