//! Resource Owner Password Credentials Flow
//!
//! RFC 6749 Section 4.3 - Resource Owner Password Credentials Grant.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use crate::core::HttpTransport;
use crate::error::OAuth2Error;
use crate::flows::TokenEndpoint;
use crate::types::{GrantType, OAuth2Config, Token};

/// Password Credentials Flow interface.
#[async_trait]
pub trait PasswordCredentialsFlow: Send + Sync {
    /// Exchange a username and password for a token.
    async fn password_credentials_token(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Token, OAuth2Error>;
}

/// Password Credentials Flow implementation.
pub struct PasswordCredentialsFlowImpl<T: HttpTransport> {
    endpoint: TokenEndpoint<T>,
}

impl<T: HttpTransport> PasswordCredentialsFlowImpl<T> {
    /// Create new Password Credentials Flow.
    pub fn new(config: Arc<OAuth2Config>, transport: Arc<T>) -> Self {
        Self {
            endpoint: TokenEndpoint::new(config, transport),
        }
    }
}

#[async_trait]
impl<T: HttpTransport> PasswordCredentialsFlow for PasswordCredentialsFlowImpl<T> {
    async fn password_credentials_token(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Token, OAuth2Error> {
        let scope = self.endpoint.config().default_scopes.join(" ");
        let mut params = vec![
            ("grant_type", GrantType::Password.as_str()),
            ("username", username),
            ("password", password.expose_secret().as_str()),
        ];
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }

        self.endpoint.request_token(&params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::oauth2_config;
    use crate::core::MockHttpTransport;
    use crate::types::ClientAuthMethod;

    #[tokio::test]
    async fn test_password_grant_body() {
        let config = oauth2_config()
            .client_id("cli")
            .client_secret("sec")
            .auth_method(ClientAuthMethod::ClientSecretBasic)
            .authorization_endpoint("https://example.com/authorize")
            .token_endpoint("https://example.com/token")
            .add_default_scope("read")
            .build()
            .unwrap();
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(200, &serde_json::json!({"access_token": "pw-token"}));

        let flow = PasswordCredentialsFlowImpl::new(Arc::new(config), transport.clone());
        let token = flow
            .password_credentials_token("alice", &SecretString::new("p@ss".to_string()))
            .await
            .unwrap();

        assert_eq!(token.access_token, "pw-token");
        assert_eq!(token.expiry, None);

        let request = transport.get_last_request().unwrap();
        assert_eq!(
            request.body.as_deref(),
            Some("grant_type=password&username=alice&password=p%40ss&scope=read")
        );
    }
}
