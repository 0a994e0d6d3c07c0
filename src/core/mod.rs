//! Core Components
//!
//! Infrastructure shared by the token lifecycle modules.

pub mod transport;

pub use transport::{
    ApiRequest, ApiResponse, HttpMethod, HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};
