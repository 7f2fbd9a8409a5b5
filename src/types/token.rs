//! Token Types
//!
//! OAuth2 token type definitions.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Tokens are treated as expired this long before their actual expiry.
pub const EXPIRY_DELTA_SECS: i64 = 10;

/// Token response from authorization server.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    #[serde(default)]
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expires in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// OAuth2 token as issued by a grant or refresh.
///
/// A refreshed token is a new value; tokens are never mutated in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Access credential.
    pub access_token: String,
    /// Token type as returned by the server.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_type: String,
    /// Refresh credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiration time. `None` means the token does not expire.
    #[serde(
        default,
        skip_serializing_if = "is_zero_expiry",
        deserialize_with = "deserialize_expiry"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

// Other OAuth2 clients persist "no expiry" as the zero time 0001-01-01T00:00:00Z.
fn is_real_expiry(expiry: &DateTime<Utc>) -> bool {
    expiry.year() > 1
}

fn is_zero_expiry(expiry: &Option<DateTime<Utc>>) -> bool {
    !expiry.as_ref().is_some_and(is_real_expiry)
}

fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let expiry = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(expiry.filter(is_real_expiry))
}

impl Token {
    /// Create a bearer token without refresh credential or expiry.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expiry: None,
        }
    }

    /// Set refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Set expiry. The zero time means no expiry.
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry).filter(is_real_expiry);
        self
    }

    /// Build a token from a token endpoint response.
    ///
    /// An `expires_in` too large to represent is treated as no expiry.
    pub fn from_response(response: TokenResponse) -> Self {
        let expiry = response
            .expires_in
            .filter(|secs| *secs > 0)
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            expiry,
        }
    }

    /// Normalized token type for the Authorization header.
    pub fn token_type(&self) -> String {
        if self.token_type.eq_ignore_ascii_case("bearer") || self.token_type.is_empty() {
            return "Bearer".to_string();
        }
        if self.token_type.eq_ignore_ascii_case("mac") {
            return "MAC".to_string();
        }
        if self.token_type.eq_ignore_ascii_case("basic") {
            return "Basic".to_string();
        }
        self.token_type.clone()
    }

    /// Check if token is expired, including the early-expiry delta.
    pub fn is_expired(&self) -> bool {
        self.expiry
            .map(|exp| exp - Duration::seconds(EXPIRY_DELTA_SECS) <= Utc::now())
            .unwrap_or(false)
    }

    /// Check if token can be used as-is.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// Check if has refresh token.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Format as Authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type(), self.access_token)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiry", &self.expiry)
            .finish()
    }
}
