//! Refresh Token Grant
//!
//! RFC 6749 Section 6 - Refreshing an Access Token.

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::HttpTransport;
use crate::error::{OAuth2Error, TokenError};
use crate::flows::TokenEndpoint;
use crate::types::{GrantType, OAuth2Config, Token};

/// Refresh grant interface.
#[async_trait]
pub trait RefreshTokenFlow: Send + Sync {
    /// Obtain a new token using a refresh token.
    ///
    /// When the server does not rotate the refresh token the returned token
    /// carries the one that was sent.
    async fn refresh(&self, refresh_token: &str) -> Result<Token, OAuth2Error>;
}

#[async_trait]
impl<F: RefreshTokenFlow + ?Sized> RefreshTokenFlow for Arc<F> {
    async fn refresh(&self, refresh_token: &str) -> Result<Token, OAuth2Error> {
        (**self).refresh(refresh_token).await
    }
}

/// Refresh grant implementation.
pub struct RefreshTokenFlowImpl<T: HttpTransport> {
    endpoint: TokenEndpoint<T>,
}

impl<T: HttpTransport> RefreshTokenFlowImpl<T> {
    /// Create new refresh flow.
    pub fn new(config: Arc<OAuth2Config>, transport: Arc<T>) -> Self {
        Self {
            endpoint: TokenEndpoint::new(config, transport),
        }
    }
}

#[async_trait]
impl<T: HttpTransport> RefreshTokenFlow for RefreshTokenFlowImpl<T> {
    async fn refresh(&self, refresh_token: &str) -> Result<Token, OAuth2Error> {
        if refresh_token.is_empty() {
            return Err(OAuth2Error::Token(TokenError::NoRefreshToken));
        }

        let mut token = self
            .endpoint
            .request_token(&[
                ("grant_type", GrantType::RefreshToken.as_str()),
                ("refresh_token", refresh_token),
            ])
            .await?;

        if !token.has_refresh_token() {
            token.refresh_token = Some(refresh_token.to_string());
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::oauth2_config;
    use crate::core::MockHttpTransport;
    use crate::types::ClientAuthMethod;

    fn create_flow() -> (RefreshTokenFlowImpl<MockHttpTransport>, Arc<MockHttpTransport>) {
        let config = oauth2_config()
            .client_id("cli")
            .auth_method(ClientAuthMethod::None)
            .authorization_endpoint("https://example.com/authorize")
            .token_endpoint("https://example.com/token")
            .build()
            .unwrap();
        let transport = Arc::new(MockHttpTransport::new());
        (
            RefreshTokenFlowImpl::new(Arc::new(config), transport.clone()),
            transport,
        )
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token_when_not_rotated() {
        let (flow, transport) = create_flow();
        transport.queue_json_response(
            200,
            &serde_json::json!({"access_token": "new-at", "expires_in": 3600}),
        );

        let token = flow.refresh("old-rt").await.unwrap();
        assert_eq!(token.access_token, "new-at");
        assert_eq!(token.refresh_token.as_deref(), Some("old-rt"));

        let request = transport.get_last_request().unwrap();
        assert_eq!(
            request.body.as_deref(),
            Some("grant_type=refresh_token&refresh_token=old-rt&client_id=cli")
        );
    }

    #[tokio::test]
    async fn test_refresh_uses_rotated_token() {
        let (flow, transport) = create_flow();
        transport.queue_json_response(
            200,
            &serde_json::json!({"access_token": "new-at", "refresh_token": "new-rt"}),
        );

        let token = flow.refresh("old-rt").await.unwrap();
        assert_eq!(token.refresh_token.as_deref(), Some("new-rt"));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let (flow, transport) = create_flow();

        let result = flow.refresh("").await;
        assert!(matches!(
            result,
            Err(OAuth2Error::Token(TokenError::NoRefreshToken))
        ));
        assert!(transport.get_requests().is_empty());
    }
}
