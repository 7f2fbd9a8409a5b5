//! Configuration Types
//!
//! OAuth2 client and token store configuration types.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OAuth2 client configuration.
#[derive(Clone, Debug)]
pub struct OAuth2Config {
    /// Provider configuration.
    pub provider: ProviderConfig,
    /// Client credentials.
    pub credentials: ClientCredentials,
    /// Redirect URL registered with the provider.
    pub redirect_url: Option<String>,
    /// Default scopes to request.
    pub default_scopes: Vec<String>,
    /// HTTP timeout.
    pub timeout: Duration,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            credentials: ClientCredentials::default(),
            redirect_url: None,
            default_scopes: Vec::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// OAuth2 provider endpoint configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Authorization endpoint URL.
    pub authorization_endpoint: String,
    /// Token endpoint URL.
    pub token_endpoint: String,
}

/// Client credentials for OAuth2 authentication.
#[derive(Clone)]
pub struct ClientCredentials {
    /// Client identifier.
    pub client_id: String,
    /// Client secret (for confidential clients).
    pub client_secret: Option<SecretString>,
    /// Client authentication method.
    pub auth_method: ClientAuthMethod,
}

impl Default for ClientCredentials {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            auth_method: ClientAuthMethod::ClientSecretBasic,
        }
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_method", &self.auth_method)
            .finish()
    }
}

/// Client authentication method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// client_id and client_secret in request body.
    ClientSecretPost,
    /// HTTP Basic Authentication header.
    #[default]
    ClientSecretBasic,
    /// No client authentication (public client).
    None,
}

/// Grant type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantType {
    #[serde(rename = "authorization_code")]
    AuthorizationCode,
    #[serde(rename = "password")]
    Password,
    #[serde(rename = "refresh_token")]
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

/// Secret Manager backed token store configuration.
#[derive(Clone, Debug)]
pub struct SecretStoreConfig {
    /// Cloud project that owns the secret.
    pub project_id: String,
    /// Secret identifier inside the project.
    pub secret_id: String,
    /// Secret Manager REST endpoint, without trailing slash.
    pub endpoint: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl SecretStoreConfig {
    /// Resource name of the project.
    pub fn project_name(&self) -> String {
        format!("projects/{}", self.project_id)
    }

    /// Resource name of the secret container.
    pub fn secret_name(&self) -> String {
        format!("projects/{}/secrets/{}", self.project_id, self.secret_id)
    }

    /// Resource name of one version (a number or the `latest` alias).
    pub fn version_name(&self, version: &str) -> String {
        format!("{}/versions/{}", self.secret_name(), version)
    }
}

/// Default configuration values.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;
pub const DEFAULT_SECRET_MANAGER_ENDPOINT: &str = "https://secretmanager.googleapis.com/v1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_type_as_str() {
        assert_eq!(GrantType::AuthorizationCode.as_str(), "authorization_code");
        assert_eq!(GrantType::Password.as_str(), "password");
        assert_eq!(GrantType::RefreshToken.as_str(), "refresh_token");
    }

    #[test]
    fn test_secret_resource_names() {
        let config = SecretStoreConfig {
            project_id: "my-project".to_string(),
            secret_id: "oauth-token".to_string(),
            endpoint: DEFAULT_SECRET_MANAGER_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
        };

        assert_eq!(config.project_name(), "projects/my-project");
        assert_eq!(config.secret_name(), "projects/my-project/secrets/oauth-token");
        assert_eq!(
            config.version_name("latest"),
            "projects/my-project/secrets/oauth-token/versions/latest"
        );
    }

    #[test]
    fn test_client_credentials_debug_redacts_secret() {
        let credentials = ClientCredentials {
            client_id: "client".to_string(),
            client_secret: Some(SecretString::new("hunter2".to_string())),
            auth_method: ClientAuthMethod::ClientSecretPost,
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("client"));
        assert!(!debug.contains("hunter2"));
    }
}
