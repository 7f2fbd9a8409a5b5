//! Token Endpoint Requests
//!
//! Shared request building and response parsing for every grant that posts
//! to the token endpoint.

use base64::Engine;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{HttpMethod, HttpRequest, HttpTransport};
use crate::error::{create_error_from_response, OAuth2Error, ProtocolError};
use crate::types::{ClientAuthMethod, OAuth2Config, Token, TokenResponse};

/// Posts grant requests to the configured token endpoint.
pub struct TokenEndpoint<T: HttpTransport> {
    config: Arc<OAuth2Config>,
    transport: Arc<T>,
}

impl<T: HttpTransport> Clone for TokenEndpoint<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl<T: HttpTransport> TokenEndpoint<T> {
    /// Create a token endpoint client.
    pub fn new(config: Arc<OAuth2Config>, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    /// Client configuration.
    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    fn build_body(&self, grant_params: &[(&str, &str)]) -> String {
        let credentials = &self.config.credentials;
        let mut form = url::form_urlencoded::Serializer::new(String::new());

        for (key, value) in grant_params {
            form.append_pair(key, value);
        }

        match credentials.auth_method {
            ClientAuthMethod::ClientSecretPost => {
                form.append_pair("client_id", &credentials.client_id);
                if let Some(secret) = &credentials.client_secret {
                    form.append_pair("client_secret", secret.expose_secret());
                }
            }
            ClientAuthMethod::None => {
                form.append_pair("client_id", &credentials.client_id);
            }
            ClientAuthMethod::ClientSecretBasic => {}
        }

        form.finish()
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        headers.insert("accept".to_string(), "application/json".to_string());

        let credentials = &self.config.credentials;
        if credentials.auth_method == ClientAuthMethod::ClientSecretBasic {
            // RFC 6749 2.3.1: both parts are form-encoded before base64
            let id: String = url::form_urlencoded::byte_serialize(credentials.client_id.as_bytes())
                .collect();
            let secret: String = credentials
                .client_secret
                .as_ref()
                .map(|s| url::form_urlencoded::byte_serialize(s.expose_secret().as_bytes()).collect())
                .unwrap_or_default();
            let encoded =
                base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", id, secret));
            headers.insert("authorization".to_string(), format!("Basic {}", encoded));
        }

        headers
    }

    /// Send a grant request and parse the issued token.
    pub async fn request_token(&self, grant_params: &[(&str, &str)]) -> Result<Token, OAuth2Error> {
        let http_request = HttpRequest {
            method: HttpMethod::Post,
            url: self.config.provider.token_endpoint.clone(),
            headers: self.build_headers(),
            body: Some(self.build_body(grant_params)),
            timeout: Some(self.config.timeout),
        };

        let response = self.transport.send(http_request).await?;

        if !response.is_success() {
            return Err(create_error_from_response(response.status, &response.body));
        }

        let token_response = match response.content_type() {
            Some("application/x-www-form-urlencoded") | Some("text/plain") => {
                parse_form_response(&response.body)
            }
            _ => serde_json::from_str::<TokenResponse>(&response.body).map_err(|e| {
                OAuth2Error::Protocol(ProtocolError::InvalidJson {
                    message: e.to_string(),
                })
            })?,
        };

        if token_response.access_token.is_empty() {
            return Err(OAuth2Error::Protocol(ProtocolError::MissingField {
                field: "access_token".to_string(),
            }));
        }

        Ok(Token::from_response(token_response))
    }
}

/// Parse a form-encoded token response (some providers still send these).
fn parse_form_response(body: &str) -> TokenResponse {
    let mut fields: HashMap<String, String> = url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect();

    let expires_in = fields
        .get("expires_in")
        .or_else(|| fields.get("expires"))
        .and_then(|v| v.parse::<u64>().ok());

    TokenResponse {
        access_token: fields.remove("access_token").unwrap_or_default(),
        token_type: fields
            .remove("token_type")
            .unwrap_or_else(|| "Bearer".to_string()),
        expires_in,
        refresh_token: fields.remove("refresh_token"),
        scope: fields.remove("scope"),
        extra: HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::oauth2_config;
    use crate::core::{HttpResponse, MockHttpTransport};
    use crate::error::ProviderError;

    fn endpoint(method: ClientAuthMethod) -> (TokenEndpoint<MockHttpTransport>, Arc<MockHttpTransport>) {
        let config = oauth2_config()
            .client_id("client id")
            .client_secret("s3cr&t")
            .auth_method(method)
            .authorization_endpoint("https://example.com/authorize")
            .token_endpoint("https://example.com/token")
            .build()
            .unwrap();
        let transport = Arc::new(MockHttpTransport::new());
        (TokenEndpoint::new(Arc::new(config), transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_basic_auth_header_is_form_encoded() {
        let (endpoint, transport) = endpoint(ClientAuthMethod::ClientSecretBasic);
        transport.queue_json_response(
            200,
            &serde_json::json!({"access_token": "at", "token_type": "bearer", "expires_in": 3600}),
        );

        let token = endpoint
            .request_token(&[("grant_type", "password")])
            .await
            .unwrap();
        assert_eq!(token.access_token, "at");
        assert!(token.expiry.is_some());

        let request = transport.get_last_request().unwrap();
        let expected = base64::engine::general_purpose::STANDARD.encode("client+id:s3cr%26t");
        assert_eq!(
            request.headers.get("authorization").unwrap(),
            &format!("Basic {}", expected)
        );
        assert_eq!(request.body.as_deref(), Some("grant_type=password"));
    }

    #[tokio::test]
    async fn test_post_auth_puts_credentials_in_body() {
        let (endpoint, transport) = endpoint(ClientAuthMethod::ClientSecretPost);
        transport.queue_json_response(200, &serde_json::json!({"access_token": "at"}));

        endpoint
            .request_token(&[("grant_type", "refresh_token"), ("refresh_token", "rt")])
            .await
            .unwrap();

        let request = transport.get_last_request().unwrap();
        assert!(!request.headers.contains_key("authorization"));
        assert_eq!(
            request.body.as_deref(),
            Some("grant_type=refresh_token&refresh_token=rt&client_id=client+id&client_secret=s3cr%26t")
        );
    }

    #[tokio::test]
    async fn test_form_encoded_response() {
        let (endpoint, transport) = endpoint(ClientAuthMethod::ClientSecretBasic);
        transport.queue_response(HttpResponse {
            status: 200,
            status_text: "OK".to_string(),
            headers: [(
                "content-type".to_string(),
                "application/x-www-form-urlencoded; charset=utf-8".to_string(),
            )]
            .into_iter()
            .collect(),
            body: "access_token=form-at&token_type=bearer&refresh_token=form-rt&expires_in=60"
                .to_string(),
        });

        let token = endpoint.request_token(&[("grant_type", "password")]).await.unwrap();
        assert_eq!(token.access_token, "form-at");
        assert_eq!(token.refresh_token.as_deref(), Some("form-rt"));
        assert!(token.expiry.is_some());
    }

    #[tokio::test]
    async fn test_created_status_is_accepted() {
        let (endpoint, transport) = endpoint(ClientAuthMethod::ClientSecretBasic);
        transport.queue_json_response(201, &serde_json::json!({"access_token": "created-at"}));

        let token = endpoint.request_token(&[("grant_type", "password")]).await.unwrap();
        assert_eq!(token.access_token, "created-at");
    }

    #[tokio::test]
    async fn test_missing_access_token_is_protocol_error() {
        let (endpoint, transport) = endpoint(ClientAuthMethod::ClientSecretBasic);
        transport.queue_json_response(200, &serde_json::json!({"token_type": "Bearer"}));

        let result = endpoint.request_token(&[("grant_type", "password")]).await;
        assert!(matches!(
            result,
            Err(OAuth2Error::Protocol(ProtocolError::MissingField { .. }))
        ));
    }

    #[tokio::test]
    async fn test_error_response_maps_to_provider_error() {
        let (endpoint, transport) = endpoint(ClientAuthMethod::ClientSecretBasic);
        transport.queue_json_response(
            400,
            &serde_json::json!({"error": "invalid_grant", "error_description": "revoked"}),
        );

        let result = endpoint.request_token(&[("grant_type", "refresh_token")]).await;
        assert!(matches!(
            result,
            Err(OAuth2Error::Provider(ProviderError::InvalidGrant { .. }))
        ));
    }
}
