//! Types
//!
//! Core type definitions for the token lifecycle.

pub mod config;
pub mod token;

pub use config::{AuthConfig, ClientCredentials};
pub use token::{RawTokenResponse, TokenInjection, TokenState};
