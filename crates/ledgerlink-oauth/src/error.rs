//! Error types for the token session.

use crate::fault::UpstreamFault;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors raised by the token session and the token endpoint.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network/HTTP transport error. Never retried.
    #[error("Network error: {0}")]
    Network(String),

    /// No tenant or session established; authenticate before calling the API.
    #[error("Not authenticated: {0}")]
    AuthConfig(String),

    /// Refresh was rejected by the token endpoint. The stored tokens are no
    /// longer usable and the authorization flow has to be repeated.
    #[error("Re-authentication required: {0}")]
    AuthExpired(String),

    /// Authorization code exchange failed.
    #[error("Authorization code exchange failed: {0}")]
    CodeExchange(String),

    /// Refresh token grant failed. `status` is the token endpoint's HTTP
    /// status when one was received.
    #[error("Token refresh failed: {message}")]
    RefreshFailed {
        status: Option<u16>,
        message: String,
    },

    /// The accounting API returned an error.
    #[error("Upstream error: {0}")]
    Upstream(UpstreamFault),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Token store error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl OAuthError {
    /// Whether this is an upstream authentication failure (HTTP 401 or
    /// vendor fault code 3200).
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, OAuthError::Upstream(fault) if fault.is_auth_failure())
    }

    /// Whether a refresh failed because the token endpoint rejected the
    /// credentials (HTTP 400 or 401).
    pub fn is_refresh_rejected(&self) -> bool {
        matches!(
            self,
            OAuthError::RefreshFailed {
                status: Some(400 | 401),
                ..
            }
        )
    }

    /// The normalized vendor fault, if this error carries one.
    pub fn fault(&self) -> Option<&UpstreamFault> {
        match self {
            OAuthError::Upstream(fault) => Some(fault),
            _ => None,
        }
    }

    /// HTTP status a caller should translate this error to.
    pub fn status(&self) -> u16 {
        match self {
            OAuthError::Upstream(fault) => fault.status,
            OAuthError::AuthConfig(_) | OAuthError::AuthExpired(_) => 401,
            OAuthError::CodeExchange(_) | OAuthError::RefreshFailed { .. } => 400,
            OAuthError::Network(_) => 502,
            OAuthError::Serialization(_) | OAuthError::Config(_) | OAuthError::Storage(_) => 500,
        }
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}
