//! Token Sources
//!
//! Single-method "produce the current token" capability and the decorators
//! that compose over it.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::OAuth2Error;
use crate::flows::RefreshTokenFlow;
use crate::types::Token;

/// Produces the current token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a usable token, fetching a new one if the source needs to.
    async fn token(&self) -> Result<Token, OAuth2Error>;
}

#[async_trait]
impl<S: TokenSource + ?Sized> TokenSource for Arc<S> {
    async fn token(&self) -> Result<Token, OAuth2Error> {
        (**self).token().await
    }
}

/// Source that always returns the same token and never refreshes.
#[derive(Clone, Debug)]
pub struct StaticTokenSource {
    token: Token,
}

impl StaticTokenSource {
    /// Create a static source.
    pub fn new(token: Token) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Token, OAuth2Error> {
        Ok(self.token.clone())
    }
}

/// Source that runs the refresh grant on every call.
///
/// Keeps the most recent refresh token so rotated refresh tokens are used for
/// the next refresh. Wrap it in a [`ReuseTokenSource`] to refresh only on expiry.
pub struct RefreshTokenSource<F: RefreshTokenFlow> {
    flow: F,
    refresh_token: Mutex<String>,
}

impl<F: RefreshTokenFlow> RefreshTokenSource<F> {
    /// Create a refresher seeded with the refresh token of `seed`.
    pub fn new(flow: F, seed: &Token) -> Self {
        Self {
            flow,
            refresh_token: Mutex::new(seed.refresh_token.clone().unwrap_or_default()),
        }
    }

    fn current_refresh_token(&self) -> String {
        self.refresh_token
            .lock()
            .map(|rt| rt.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl<F: RefreshTokenFlow> TokenSource for RefreshTokenSource<F> {
    async fn token(&self) -> Result<Token, OAuth2Error> {
        let refresh_token = self.current_refresh_token();
        let token = self.flow.refresh(&refresh_token).await?;

        if let Some(new_refresh_token) = &token.refresh_token {
            if *new_refresh_token != refresh_token {
                let mut guard = self
                    .refresh_token
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *guard = new_refresh_token.clone();
            }
        }

        Ok(token)
    }
}

/// Returns the cached token while it is valid and asks the inner source for a
/// new one only once it has expired.
///
/// The cache lock is held across the inner call, so concurrent callers wait
/// for one refresh instead of each triggering their own.
pub struct ReuseTokenSource<S: TokenSource> {
    current: tokio::sync::Mutex<Option<Token>>,
    inner: S,
}

impl<S: TokenSource> ReuseTokenSource<S> {
    /// Create a reuse cache, optionally seeded with an existing token.
    pub fn new(seed: Option<Token>, inner: S) -> Self {
        Self {
            current: tokio::sync::Mutex::new(seed),
            inner,
        }
    }
}

#[async_trait]
impl<S: TokenSource> TokenSource for ReuseTokenSource<S> {
    async fn token(&self) -> Result<Token, OAuth2Error> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref() {
            if token.is_valid() {
                return Ok(token.clone());
            }
        }

        let token = self.inner.token().await?;
        *current = Some(token.clone());
        Ok(token)
    }
}
