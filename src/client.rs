//! Persistent OAuth2 Client
//!
//! OAuth2 configuration bound to a token store, so refreshed tokens outlive
//! the process.

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

use crate::core::{create_transport, HttpRequest, HttpResponse, HttpTransport, ReqwestHttpTransport};
use crate::error::OAuth2Error;
use crate::flows::{
    AuthorizationCodeFlow, AuthorizationCodeFlowImpl, PasswordCredentialsFlow,
    PasswordCredentialsFlowImpl, RefreshTokenFlowImpl,
};
use crate::token::{
    NotifyingTokenSource, RefreshTokenSource, ReuseTokenSource, TokenSource, TokenStore,
};
use crate::types::{AuthCodeOption, OAuth2Config, Token};

/// Refresh-on-expiry token source without persistence.
pub type RefreshingTokenSource<T> = ReuseTokenSource<RefreshTokenSource<RefreshTokenFlowImpl<T>>>;

/// HTTP transport that authorizes every request with the current token.
pub struct AuthorizedClient<T: HttpTransport> {
    source: Arc<dyn TokenSource>,
    transport: Arc<T>,
}

impl<T: HttpTransport> AuthorizedClient<T> {
    /// Authorize requests sent over `transport` with tokens from `source`.
    pub fn new(source: Arc<dyn TokenSource>, transport: Arc<T>) -> Self {
        Self { source, transport }
    }

    /// Token source requests are authorized with.
    pub fn token_source(&self) -> &Arc<dyn TokenSource> {
        &self.source
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for AuthorizedClient<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, OAuth2Error> {
        let token = self.source.token().await?;
        self.transport
            .send(request.header("authorization", token.authorization_header()))
            .await
    }
}

/// OAuth2 configuration that persists tokens to a [`TokenStore`].
///
/// Clients built by [`client`](Self::client) save every refreshed token.
/// The token the client is seeded with is not saved; persist it with
/// [`save_token`](Self::save_token) or obtain it from
/// [`restore_token`](Self::restore_token).
pub struct PersistentOAuthConfig<T: HttpTransport = ReqwestHttpTransport> {
    config: Arc<OAuth2Config>,
    store: Arc<dyn TokenStore>,
    transport: Arc<T>,
}

impl PersistentOAuthConfig<ReqwestHttpTransport> {
    /// Create a persistent config using the default HTTP transport.
    pub fn new(config: OAuth2Config, store: Arc<dyn TokenStore>) -> Result<Self, OAuth2Error> {
        let transport = Arc::new(create_transport(Some(config.timeout))?);
        Ok(Self::with_transport(config, store, transport))
    }
}

impl<T: HttpTransport + 'static> PersistentOAuthConfig<T> {
    /// Create a persistent config with a custom transport.
    pub fn with_transport(config: OAuth2Config, store: Arc<dyn TokenStore>, transport: Arc<T>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            transport,
        }
    }

    /// Get the OAuth2 configuration.
    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    /// Get the token store.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Build the consent page URL.
    pub fn auth_code_url(&self, state: &str, options: &[AuthCodeOption]) -> String {
        AuthorizationCodeFlowImpl::new(self.config.clone(), self.transport.clone())
            .auth_code_url(state, options)
    }

    /// Exchange an authorization code. The token is not saved.
    pub async fn exchange(
        &self,
        code: &str,
        options: &[AuthCodeOption],
    ) -> Result<Token, OAuth2Error> {
        AuthorizationCodeFlowImpl::new(self.config.clone(), self.transport.clone())
            .exchange(code, options)
            .await
    }

    /// Run the password grant. The token is not saved.
    pub async fn password_credentials_token(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Token, OAuth2Error> {
        PasswordCredentialsFlowImpl::new(self.config.clone(), self.transport.clone())
            .password_credentials_token(username, password)
            .await
    }

    /// Token source that refreshes `seed` on expiry without saving anything.
    pub fn token_source(&self, seed: &Token) -> RefreshingTokenSource<T> {
        ReuseTokenSource::new(Some(seed.clone()), self.refresher(seed))
    }

    /// Token source that refreshes `seed` on expiry and saves each refreshed
    /// token to the store.
    pub fn persistent_token_source(&self, seed: &Token) -> Arc<dyn TokenSource> {
        let notifying = NotifyingTokenSource::new(self.store.clone(), self.refresher(seed));
        Arc::new(ReuseTokenSource::new(Some(seed.clone()), notifying))
    }

    /// Save `token` as the current token.
    pub async fn save_token(&self, token: &Token) -> Result<(), OAuth2Error> {
        self.store.save(token).await
    }

    /// Load the most recently saved token.
    pub async fn restore_token(&self) -> Result<Token, OAuth2Error> {
        self.store.get().await
    }

    /// HTTP client authorized with `seed`, refreshing and saving tokens as
    /// they expire.
    pub fn client(&self, seed: &Token) -> AuthorizedClient<T> {
        AuthorizedClient::new(self.persistent_token_source(seed), self.transport.clone())
    }

    fn refresher(&self, seed: &Token) -> RefreshTokenSource<RefreshTokenFlowImpl<T>> {
        RefreshTokenSource::new(
            RefreshTokenFlowImpl::new(self.config.clone(), self.transport.clone()),
            seed,
        )
    }
}
