//! Client error types.

use ledgerlink_oauth::{OAuthError, UpstreamFault};
use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The token session failed: not authenticated, refresh rejected,
    /// transport failure, or an upstream fault.
    #[error(transparent)]
    Session(#[from] OAuthError),

    /// A lookup matched no rows.
    #[error("{entity} '{id}' not found")]
    NotFound {
        /// Entity name (`Customer`, `Invoice`, ...).
        entity: &'static str,
        /// Id or name that was looked up.
        id: String,
    },

    /// The request cannot be sent as given.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The upstream answered with a payload missing the expected entity.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. }) || self.status() == Some(404)
    }

    /// Check if the session has to be re-authorized.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Error::Session(OAuthError::AuthExpired(_)))
    }

    /// Check if no session or tenant has been established.
    pub fn is_auth_config(&self) -> bool {
        matches!(self, Error::Session(OAuthError::AuthConfig(_)))
    }

    /// The normalized vendor fault, if any.
    pub fn fault(&self) -> Option<&UpstreamFault> {
        match self {
            Error::Session(e) => e.fault(),
            _ => None,
        }
    }

    /// Whether the vendor fault carries `code`.
    pub fn has_fault_code(&self, code: &str) -> bool {
        self.fault().is_some_and(|f| f.has_code(code))
    }

    /// Upstream HTTP status, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        self.fault().map(|f| f.status)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upstream(status: u16, code: &str) -> Error {
        Error::Session(OAuthError::Upstream(UpstreamFault::from_value(
            status,
            json!({"Fault": {"Error": [{"Message": "boom", "code": code}], "type": "ValidationFault"}}),
        )))
    }

    #[test]
    fn test_not_found_classification() {
        let err = Error::NotFound {
            entity: "Customer",
            id: "42".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Customer '42' not found");
        assert!(upstream(404, "610").is_not_found());
        assert!(!upstream(400, "610").is_not_found());
    }

    #[test]
    fn test_session_classification() {
        assert!(Error::from(OAuthError::AuthExpired("gone".into())).is_auth_expired());
        assert!(Error::from(OAuthError::AuthConfig("no tenant".into())).is_auth_config());
        assert!(!upstream(400, "6240").is_auth_expired());
    }

    #[test]
    fn test_fault_code_lookup() {
        let err = upstream(400, "6240");
        assert!(err.has_fault_code("6240"));
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.fault().map(|f| f.message.as_str()), Some("boom"));
    }
}
