//! Configuration Builder
//!
//! Fluent builders for OAuth2 and Secret Manager store configuration.

use std::time::Duration;

use crate::error::{ConfigurationError, OAuth2Error};
use crate::types::{
    ClientAuthMethod, ClientCredentials, OAuth2Config, ProviderConfig, SecretStoreConfig,
    DEFAULT_SECRET_MANAGER_ENDPOINT, DEFAULT_TIMEOUT_MS,
};
use secrecy::SecretString;

fn missing(field: &str) -> OAuth2Error {
    OAuth2Error::Configuration(ConfigurationError::MissingRequired {
        field: field.to_string(),
    })
}

fn validate_url(url: &str) -> Result<(), OAuth2Error> {
    url::Url::parse(url).map(|_| ()).map_err(|_| {
        OAuth2Error::Configuration(ConfigurationError::InvalidEndpoint {
            url: url.to_string(),
        })
    })
}

/// OAuth2 configuration builder.
#[derive(Default)]
pub struct OAuth2ConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    auth_method: Option<ClientAuthMethod>,
    authorization_endpoint: Option<String>,
    token_endpoint: Option<String>,
    redirect_url: Option<String>,
    default_scopes: Vec<String>,
    timeout: Duration,
}

impl OAuth2ConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            ..Default::default()
        }
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set client authentication method.
    pub fn auth_method(mut self, method: ClientAuthMethod) -> Self {
        self.auth_method = Some(method);
        self
    }

    /// Set authorization endpoint.
    pub fn authorization_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.authorization_endpoint = Some(endpoint.into());
        self
    }

    /// Set token endpoint.
    pub fn token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = Some(endpoint.into());
        self
    }

    /// Set redirect URL.
    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    /// Set default scopes.
    pub fn default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Add a default scope.
    pub fn add_default_scope(mut self, scope: impl Into<String>) -> Self {
        self.default_scopes.push(scope.into());
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure endpoints from an existing provider config.
    pub fn from_provider_config(mut self, provider: ProviderConfig) -> Self {
        self.authorization_endpoint = Some(provider.authorization_endpoint);
        self.token_endpoint = Some(provider.token_endpoint);
        self
    }

    /// Build the OAuth2 configuration.
    pub fn build(self) -> Result<OAuth2Config, OAuth2Error> {
        let client_id = self.client_id.ok_or_else(|| missing("client_id"))?;
        let authorization_endpoint = self
            .authorization_endpoint
            .ok_or_else(|| missing("authorization_endpoint"))?;
        let token_endpoint = self.token_endpoint.ok_or_else(|| missing("token_endpoint"))?;

        validate_url(&authorization_endpoint)?;
        validate_url(&token_endpoint)?;
        if let Some(redirect_url) = &self.redirect_url {
            validate_url(redirect_url)?;
        }

        let auth_method = self.auth_method.unwrap_or_default();

        // Confidential client methods need a secret
        if matches!(
            auth_method,
            ClientAuthMethod::ClientSecretBasic | ClientAuthMethod::ClientSecretPost
        ) && self.client_secret.is_none()
        {
            return Err(missing("client_secret"));
        }

        Ok(OAuth2Config {
            provider: ProviderConfig {
                authorization_endpoint,
                token_endpoint,
            },
            credentials: ClientCredentials {
                client_id,
                client_secret: self.client_secret,
                auth_method,
            },
            redirect_url: self.redirect_url,
            default_scopes: self.default_scopes,
            timeout: self.timeout,
        })
    }
}

/// Create a new OAuth2 configuration builder.
pub fn oauth2_config() -> OAuth2ConfigBuilder {
    OAuth2ConfigBuilder::new()
}

/// Secret Manager store configuration builder.
pub struct SecretStoreConfigBuilder {
    project_id: Option<String>,
    secret_id: Option<String>,
    endpoint: String,
    timeout: Duration,
}

impl Default for SecretStoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStoreConfigBuilder {
    /// Create new builder with the public endpoint and default timeout.
    pub fn new() -> Self {
        Self {
            project_id: None,
            secret_id: None,
            endpoint: DEFAULT_SECRET_MANAGER_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Set project ID.
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set secret ID.
    pub fn secret_id(mut self, secret_id: impl Into<String>) -> Self {
        self.secret_id = Some(secret_id.into());
        self
    }

    /// Override the REST endpoint (regional endpoints, emulators).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the store configuration.
    pub fn build(self) -> Result<SecretStoreConfig, OAuth2Error> {
        let project_id = self
            .project_id
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| missing("project_id"))?;
        let secret_id = self
            .secret_id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| missing("secret_id"))?;

        if secret_id.contains('/') || project_id.contains('/') {
            return Err(OAuth2Error::Configuration(ConfigurationError::InvalidConfig {
                message: "project_id and secret_id must not contain '/'".to_string(),
            }));
        }

        validate_url(&self.endpoint)?;

        Ok(SecretStoreConfig {
            project_id,
            secret_id,
            endpoint: self.endpoint.trim_end_matches('/').to_string(),
            timeout: self.timeout,
        })
    }
}

/// Create a new Secret Manager store configuration builder.
pub fn secret_store_config() -> SecretStoreConfigBuilder {
    SecretStoreConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_success() {
        let config = OAuth2ConfigBuilder::new()
            .client_id("test-client")
            .client_secret("test-secret")
            .authorization_endpoint("https://example.com/authorize")
            .token_endpoint("https://example.com/token")
            .redirect_url("https://app.example.com/callback")
            .add_default_scope("openid")
            .add_default_scope("profile")
            .build()
            .unwrap();

        assert_eq!(config.credentials.client_id, "test-client");
        assert_eq!(
            config.provider.authorization_endpoint,
            "https://example.com/authorize"
        );
        assert_eq!(
            config.redirect_url.as_deref(),
            Some("https://app.example.com/callback")
        );
        assert_eq!(config.default_scopes, vec!["openid", "profile"]);
    }

    #[test]
    fn test_builder_missing_client_id() {
        let result = OAuth2ConfigBuilder::new()
            .client_secret("test-secret")
            .authorization_endpoint("https://example.com/authorize")
            .token_endpoint("https://example.com/token")
            .build();

        assert!(matches!(
            result,
            Err(OAuth2Error::Configuration(ConfigurationError::MissingRequired { .. }))
        ));
    }

    #[test]
    fn test_builder_missing_secret_with_basic_auth() {
        let result = OAuth2ConfigBuilder::new()
            .client_id("test-client")
            .auth_method(ClientAuthMethod::ClientSecretBasic)
            .authorization_endpoint("https://example.com/authorize")
            .token_endpoint("https://example.com/token")
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_builder_no_secret_required_for_none_auth() {
        let config = OAuth2ConfigBuilder::new()
            .client_id("test-client")
            .auth_method(ClientAuthMethod::None)
            .authorization_endpoint("https://example.com/authorize")
            .token_endpoint("https://example.com/token")
            .build()
            .unwrap();

        assert!(config.credentials.client_secret.is_none());
    }

    #[test]
    fn test_builder_rejects_invalid_endpoint() {
        let result = OAuth2ConfigBuilder::new()
            .client_id("test-client")
            .auth_method(ClientAuthMethod::None)
            .authorization_endpoint("not a url")
            .token_endpoint("https://example.com/token")
            .build();

        assert!(matches!(
            result,
            Err(OAuth2Error::Configuration(ConfigurationError::InvalidEndpoint { .. }))
        ));
    }

    #[test]
    fn test_secret_store_builder_defaults() {
        let config = secret_store_config()
            .project_id("my-project")
            .secret_id("oauth-token")
            .build()
            .unwrap();

        assert_eq!(config.endpoint, DEFAULT_SECRET_MANAGER_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.secret_name(), "projects/my-project/secrets/oauth-token");
    }

    #[test]
    fn test_secret_store_builder_trims_endpoint() {
        let config = secret_store_config()
            .project_id("p")
            .secret_id("s")
            .endpoint("http://localhost:8085/v1/")
            .build()
            .unwrap();

        assert_eq!(config.endpoint, "http://localhost:8085/v1");
    }

    #[test]
    fn test_secret_store_builder_requires_ids() {
        assert!(secret_store_config().secret_id("s").build().is_err());
        assert!(secret_store_config().project_id("p").build().is_err());
        assert!(secret_store_config()
            .project_id("p")
            .secret_id("a/b")
            .build()
            .is_err());
    }
}
