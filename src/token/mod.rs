//! Token Persistence
//!
//! Token sources, the decorators that compose over them, and the stores that
//! keep the current token across restarts:
//!
//! - **Token Sources**: static, refreshing and reuse-until-expiry sources
//! - **Notifying Source**: saves every newly obtained token to a store
//! - **Token Stores**: in-memory, file and Secret Manager backends

pub mod file;
pub mod notifying;
pub mod secret_manager;
pub mod source;
pub mod storage;

// Token Sources
pub use notifying::NotifyingTokenSource;
pub use source::{RefreshTokenSource, ReuseTokenSource, StaticTokenSource, TokenSource};

// Token Stores
pub use file::FileTokenStore;
pub use secret_manager::{
    GcpSecretVersionStore, InMemorySecretVersionService, Replication, RestSecretVersionStore,
    Secret, SecretManagerRestClient, SecretOperation, SecretVersion, SecretVersionService,
};
pub use storage::{InMemoryTokenStore, MockTokenStore, TokenStore};
