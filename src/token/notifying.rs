//! Store-Notifying Token Source
//!
//! Persists every token the wrapped source produces before handing it out.

use async_trait::async_trait;

use crate::error::OAuth2Error;
use crate::token::{TokenSource, TokenStore};
use crate::types::Token;

/// Token source that saves each new token to a store.
///
/// Put it *inside* a [`ReuseTokenSource`](crate::token::ReuseTokenSource) so
/// the store is written once per refresh rather than once per request.
///
/// If the save fails the save error is returned and the freshly obtained token
/// is dropped; callers that would rather keep using it must fetch it from the
/// inner source themselves.
pub struct NotifyingTokenSource<S: TokenSource, St: TokenStore> {
    source: S,
    store: St,
}

impl<S: TokenSource, St: TokenStore> NotifyingTokenSource<S, St> {
    /// Wrap `source` so its tokens are saved to `store`.
    pub fn new(store: St, source: S) -> Self {
        Self { source, store }
    }
}

#[async_trait]
impl<S: TokenSource, St: TokenStore> TokenSource for NotifyingTokenSource<S, St> {
    async fn token(&self) -> Result<Token, OAuth2Error> {
        // A failed fetch must never overwrite what is stored.
        let token = self.source.token().await?;
        self.store.save(&token).await?;
        Ok(token)
    }
}
