//! Token Management
//!
//! Token persistence and refresh coordination primitives.

pub mod lock;
pub mod store;

pub use lock::RefreshLock;
pub use store::{
    InMemoryBackend, MockBackend, PersistenceBackend, TokenStore, TOKEN_STORAGE_KEY,
};
