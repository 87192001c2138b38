//! Client credential resolution.
//!
//! Resolution order:
//! 1. Environment variable
//! 2. Config file (with warning for the secret)

use crate::error::{ConfigError, Result};
use crate::types::LedgerConfig;

/// Environment variable for the OAuth client id.
pub const CLIENT_ID_ENV: &str = "LEDGERLINK_CLIENT_ID";

/// Environment variable for the OAuth client secret.
pub const CLIENT_SECRET_ENV: &str = "LEDGERLINK_CLIENT_SECRET";

/// Result of secret resolution with provenance.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    /// The secret value.
    pub value: String,
    /// Where the secret was found.
    pub source: SecretSource,
}

impl std::fmt::Debug for ResolvedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecret")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Environment variable.
    EnvVar(String),
    /// Config file (plaintext, not recommended for secrets).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve a value from `env_var`, falling back to the config file value.
pub fn resolve_secret(env_var: &str, config_value: Option<&str>) -> Option<ResolvedSecret> {
    resolve_secret_with(env_var, config_value, |var| std::env::var(var).ok())
}

/// Same as [`resolve_secret`] with an injectable environment lookup.
pub fn resolve_secret_with(
    env_var: &str,
    config_value: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<ResolvedSecret> {
    if let Some(value) = lookup(env_var)
        && !value.is_empty()
    {
        return Some(ResolvedSecret {
            value,
            source: SecretSource::EnvVar(env_var.to_string()),
        });
    }

    config_value
        .filter(|v| !v.is_empty())
        .map(|v| ResolvedSecret {
            value: v.to_string(),
            source: SecretSource::ConfigFile,
        })
}

/// OAuth client id and secret with provenance.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: ResolvedSecret,
    pub client_secret: ResolvedSecret,
}

impl LedgerConfig {
    /// Resolve client id and secret from the environment and config.
    pub fn client_credentials(&self) -> Result<ClientCredentials> {
        self.client_credentials_with(|var| std::env::var(var).ok())
    }

    /// Same as [`LedgerConfig::client_credentials`] with an injectable
    /// environment lookup.
    pub fn client_credentials_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ClientCredentials> {
        let oauth = self.oauth();

        let client_id = resolve_secret_with(CLIENT_ID_ENV, oauth.client_id.as_deref(), &lookup)
            .ok_or_else(|| ConfigError::SecretNotFound {
                name: "OAuth client id".to_string(),
                env_var: CLIENT_ID_ENV.to_string(),
            })?;

        let client_secret =
            resolve_secret_with(CLIENT_SECRET_ENV, oauth.client_secret.as_deref(), &lookup)
                .ok_or_else(|| ConfigError::SecretNotFound {
                    name: "OAuth client secret".to_string(),
                    env_var: CLIENT_SECRET_ENV.to_string(),
                })?;

        Ok(ClientCredentials {
            client_id,
            client_secret,
        })
    }
}
