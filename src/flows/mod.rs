//! OAuth2 Flows
//!
//! Grant implementations the persistent config delegates to:
//!
//! - **Authorization Code Flow** (RFC 6749 Section 4.1)
//! - **Password Credentials Flow** (RFC 6749 Section 4.3)
//! - **Refresh Token Grant** (RFC 6749 Section 6)

pub mod authorization_code;
pub mod password;
pub mod refresh;
pub mod token_request;

pub use authorization_code::{AuthorizationCodeFlow, AuthorizationCodeFlowImpl};
pub use password::{PasswordCredentialsFlow, PasswordCredentialsFlowImpl};
pub use refresh::{RefreshTokenFlow, RefreshTokenFlowImpl};
pub use token_request::TokenEndpoint;
