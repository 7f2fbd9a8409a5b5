//! Types
//!
//! Core type definitions for tokens, configuration and authorization options.

pub mod auth;
pub mod config;
pub mod token;

pub use auth::*;
pub use config::*;
pub use token::*;
