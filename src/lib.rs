//! OAuth2 Token Store
//!
//! Persists OAuth2 tokens so a session survives process restarts.
//!
//! # Features
//!
//! - Token stores: file, Google Cloud Secret Manager versions, in-memory
//! - Store-notifying token source that saves every refreshed token
//! - Persistent OAuth2 configuration (Authorization Code, Password, Refresh)
//! - HTTP client that authorizes requests and refreshes on expiry
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oauth2_token_store::{oauth2_config, FileTokenStore, PersistentOAuthConfig, HttpTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = oauth2_config()
//!         .client_id("my-client-id")
//!         .client_secret("my-client-secret")
//!         .authorization_endpoint("https://provider.com/authorize")
//!         .token_endpoint("https://provider.com/token")
//!         .redirect_url("https://myapp.com/callback")
//!         .build()?;
//!
//!     let store = Arc::new(FileTokenStore::new("token.json"));
//!     let persistent = PersistentOAuthConfig::new(config, store)?;
//!
//!     let token = match persistent.restore_token().await {
//!         Ok(token) => token,
//!         Err(e) if e.is_not_found() => {
//!             let token = persistent.exchange("code-from-callback", &[]).await?;
//!             persistent.save_token(&token).await?;
//!             token
//!         }
//!         Err(e) => return Err(e.into()),
//!     };
//!
//!     // Refreshed tokens are written back to token.json.
//!     let client = persistent.client(&token);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: token, configuration and authorization option types
//! - `error`: error hierarchy with provider error mapping
//! - `core`: HTTP transport
//! - `flows`: grant implementations (auth code, password, refresh)
//! - `token`: token sources, notifying decorator and token stores
//! - `builders`: fluent builders for configuration
//! - `telemetry`: injectable structured logging
//! - `client`: persistent configuration and the authorized HTTP client

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod flows;
pub mod telemetry;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{AuthorizedClient, PersistentOAuthConfig, RefreshingTokenSource};

// Re-export builders
pub use builders::{oauth2_config, secret_store_config, OAuth2ConfigBuilder, SecretStoreConfigBuilder};

// Re-export errors
pub use error::{
    create_error_from_response, map_token_error, parse_error_response, ConfigurationError,
    NetworkError, OAuth2Error, OAuth2ErrorResponse, OAuth2Result, ProtocolError, ProviderError,
    StorageError, TokenError,
};

// Re-export types
pub use types::{
    // Config
    ClientAuthMethod, ClientCredentials, GrantType, OAuth2Config, ProviderConfig,
    SecretStoreConfig,
    // Token
    Token, TokenResponse,
    // Auth
    AuthCodeOption,
};

// Re-export core components
pub use core::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};

// Re-export flows
pub use flows::{
    AuthorizationCodeFlow, AuthorizationCodeFlowImpl, PasswordCredentialsFlow,
    PasswordCredentialsFlowImpl, RefreshTokenFlow, RefreshTokenFlowImpl,
};

// Re-export token persistence
pub use token::{
    // Sources
    NotifyingTokenSource, RefreshTokenSource, ReuseTokenSource, StaticTokenSource, TokenSource,
    // Stores
    FileTokenStore, GcpSecretVersionStore, InMemoryTokenStore, MockTokenStore,
    RestSecretVersionStore, TokenStore,
    // Secret Manager
    InMemorySecretVersionService, Replication, SecretManagerRestClient, SecretVersionService,
};

// Re-export telemetry
pub use telemetry::{
    create_in_memory_logger, no_op_logger, InMemoryLogger, LogContext, LogEntry, LogLevel,
    Logger, NoOpLogger, TracingLogger,
};
