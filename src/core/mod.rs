//! Core Components
//!
//! HTTP transport shared by the OAuth2 flows and the Secret Manager client.

pub mod transport;

pub use transport::*;
