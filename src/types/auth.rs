//! Authorization Types
//!
//! Options passed to authorization URL construction and code exchange.

/// Extra parameter for the authorization URL or the code exchange request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthCodeOption {
    /// `access_type=online`.
    AccessTypeOnline,
    /// `access_type=offline`, asks the provider for a refresh token.
    AccessTypeOffline,
    /// `prompt=consent`, forces the consent screen.
    ApprovalForce,
    /// Arbitrary key/value parameter.
    Param { key: String, value: String },
}

impl AuthCodeOption {
    /// Create an arbitrary parameter option.
    pub fn param(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Param {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Key/value pair this option contributes.
    pub fn as_pair(&self) -> (&str, &str) {
        match self {
            Self::AccessTypeOnline => ("access_type", "online"),
            Self::AccessTypeOffline => ("access_type", "offline"),
            Self::ApprovalForce => ("prompt", "consent"),
            Self::Param { key, value } => (key.as_str(), value.as_str()),
        }
    }
}
