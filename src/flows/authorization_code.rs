//! Authorization Code Flow
//!
//! RFC 6749 Section 4.1 - Authorization Code Grant.

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::HttpTransport;
use crate::error::OAuth2Error;
use crate::flows::TokenEndpoint;
use crate::types::{AuthCodeOption, GrantType, OAuth2Config, Token};

/// Authorization Code Flow interface.
#[async_trait]
pub trait AuthorizationCodeFlow: Send + Sync {
    /// Build the URL the resource owner is sent to for consent.
    fn auth_code_url(&self, state: &str, options: &[AuthCodeOption]) -> String;

    /// Exchange an authorization code for a token.
    async fn exchange(&self, code: &str, options: &[AuthCodeOption]) -> Result<Token, OAuth2Error>;
}

/// Authorization Code Flow implementation.
pub struct AuthorizationCodeFlowImpl<T: HttpTransport> {
    endpoint: TokenEndpoint<T>,
}

impl<T: HttpTransport> AuthorizationCodeFlowImpl<T> {
    /// Create new Authorization Code Flow.
    pub fn new(config: Arc<OAuth2Config>, transport: Arc<T>) -> Self {
        Self {
            endpoint: TokenEndpoint::new(config, transport),
        }
    }

    fn config(&self) -> &OAuth2Config {
        self.endpoint.config()
    }
}

#[async_trait]
impl<T: HttpTransport> AuthorizationCodeFlow for AuthorizationCodeFlowImpl<T> {
    fn auth_code_url(&self, state: &str, options: &[AuthCodeOption]) -> String {
        let config = self.config();
        let mut query = url::form_urlencoded::Serializer::new(String::new());

        query.append_pair("response_type", "code");
        query.append_pair("client_id", &config.credentials.client_id);
        if let Some(redirect_url) = &config.redirect_url {
            query.append_pair("redirect_uri", redirect_url);
        }
        if !config.default_scopes.is_empty() {
            query.append_pair("scope", &config.default_scopes.join(" "));
        }
        if !state.is_empty() {
            query.append_pair("state", state);
        }
        for option in options {
            let (key, value) = option.as_pair();
            query.append_pair(key, value);
        }

        let endpoint = &config.provider.authorization_endpoint;
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}{}", endpoint, separator, query.finish())
    }

    async fn exchange(&self, code: &str, options: &[AuthCodeOption]) -> Result<Token, OAuth2Error> {
        let mut params = vec![
            ("grant_type", GrantType::AuthorizationCode.as_str()),
            ("code", code),
        ];
        if let Some(redirect_url) = &self.config().redirect_url {
            params.push(("redirect_uri", redirect_url.as_str()));
        }
        params.extend(options.iter().map(AuthCodeOption::as_pair));

        self.endpoint.request_token(&params).await
    }
}
