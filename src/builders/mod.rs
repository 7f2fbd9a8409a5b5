//! Builders
//!
//! Fluent builder patterns for OAuth2 and token store configuration.

pub mod config;

pub use config::{oauth2_config, secret_store_config, OAuth2ConfigBuilder, SecretStoreConfigBuilder};
