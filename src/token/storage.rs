//! Token Storage
//!
//! The durable single-slot token store contract and its simple variants.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{OAuth2Error, StorageError};
use crate::types::Token;

/// Durable holder of the current token.
///
/// Implementations provide no mutual exclusion; callers that refresh
/// concurrently must serialize `save` themselves.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Return the most recently saved token.
    ///
    /// Fails with [`StorageError::NotFound`] if nothing was ever saved.
    async fn get(&self) -> Result<Token, OAuth2Error>;

    /// Record `token` as current, superseding whatever was saved before.
    async fn save(&self, token: &Token) -> Result<(), OAuth2Error>;
}

#[async_trait]
impl<S: TokenStore + ?Sized> TokenStore for Arc<S> {
    async fn get(&self) -> Result<Token, OAuth2Error> {
        (**self).get().await
    }

    async fn save(&self, token: &Token) -> Result<(), OAuth2Error> {
        (**self).save(token).await
    }
}

pub(crate) fn not_found(resource: impl Into<String>) -> OAuth2Error {
    OAuth2Error::Storage(StorageError::NotFound {
        resource: resource.into(),
    })
}

/// In-memory token store. Does not survive a restart.
#[derive(Default)]
pub struct InMemoryTokenStore {
    token: Mutex<Option<Token>>,
}

impl InMemoryTokenStore {
    /// Create new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self) -> Result<Token, OAuth2Error> {
        lock(&self.token)
            .clone()
            .ok_or_else(|| not_found("in-memory token"))
    }

    async fn save(&self, token: &Token) -> Result<(), OAuth2Error> {
        *lock(&self.token) = Some(token.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock token store for testing.
///
/// Records every successful save and can be told to fail saves.
#[derive(Default)]
pub struct MockTokenStore {
    token: Mutex<Option<Token>>,
    save_history: Mutex<Vec<Token>>,
    get_count: Mutex<usize>,
    fail_saves: Mutex<bool>,
}

impl MockTokenStore {
    /// Create new mock token store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock store already holding a token.
    pub fn with_token(token: Token) -> Self {
        let store = Self::default();
        *lock(&store.token) = Some(token);
        store
    }

    /// Make every save fail with a transport error.
    pub fn set_fail_saves(&self, fail: bool) -> &Self {
        *lock(&self.fail_saves) = fail;
        self
    }

    /// Tokens passed to successful saves, in order.
    pub fn get_save_history(&self) -> Vec<Token> {
        lock(&self.save_history).clone()
    }

    /// Number of get calls.
    pub fn get_count(&self) -> usize {
        *lock(&self.get_count)
    }

    /// Current stored token.
    pub fn current(&self) -> Option<Token> {
        lock(&self.token).clone()
    }
}

#[async_trait]
impl TokenStore for MockTokenStore {
    async fn get(&self) -> Result<Token, OAuth2Error> {
        *lock(&self.get_count) += 1;
        self.current().ok_or_else(|| not_found("mock token"))
    }

    async fn save(&self, token: &Token) -> Result<(), OAuth2Error> {
        if *lock(&self.fail_saves) {
            return Err(OAuth2Error::Storage(StorageError::Transport {
                message: "Mock storage failure".to_string(),
            }));
        }

        lock(&self.save_history).push(token.clone());
        *lock(&self.token) = Some(token.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn create_test_token(access: &str) -> Token {
        Token::new(access)
            .with_refresh_token("test-refresh-token")
            .with_expiry(Utc::now() + Duration::hours(1))
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemoryTokenStore::new();
        let token = create_test_token("a1");

        store.save(&token).await.unwrap();
        assert_eq!(store.get().await.unwrap(), token);

        let replacement = create_test_token("a2");
        store.save(&replacement).await.unwrap();
        assert_eq!(store.get().await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn test_in_memory_empty_is_not_found() {
        let store = InMemoryTokenStore::new();
        let error = store.get().await.unwrap_err();
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_mock_store_history() {
        let store = MockTokenStore::new();
        store.save(&create_test_token("a1")).await.unwrap();
        store.save(&create_test_token("a2")).await.unwrap();

        let history = store.get_save_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].access_token, "a2");
        assert_eq!(store.get().await.unwrap().access_token, "a2");
        assert_eq!(store.get_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_store_failure() {
        let store = MockTokenStore::with_token(create_test_token("kept"));
        store.set_fail_saves(true);

        assert!(store.save(&create_test_token("lost")).await.is_err());
        assert!(store.get_save_history().is_empty());
        assert_eq!(store.current().unwrap().access_token, "kept");
    }

    #[tokio::test]
    async fn test_mock_store_survives_poisoned_lock() {
        let store = Arc::new(MockTokenStore::with_token(create_test_token("before")));
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.token.lock().unwrap();
            panic!("poison the token slot");
        })
        .join();
        assert!(store.token.is_poisoned());

        assert_eq!(store.get().await.unwrap().access_token, "before");
        store.save(&create_test_token("after")).await.unwrap();
        assert_eq!(store.current().unwrap().access_token, "after");
    }

    #[tokio::test]
    async fn test_store_through_trait_object() {
        let store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
        store.save(&create_test_token("dyn")).await.unwrap();
        assert_eq!(store.get().await.unwrap().access_token, "dyn");
    }
}
