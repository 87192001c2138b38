//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! environment = "sandbox"          # or "production"
//!
//! [oauth]
//! client_id = "AB..."
//! redirect_uri = "https://example.com/callback"
//!
//! [api]
//! minor_version = 75
//! timeout_secs = 30
//!
//! [session]
//! token_file = "/var/lib/ledgerlink/session.json"
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Sandbox accounting API base URL.
pub const SANDBOX_API_BASE_URL: &str = "https://sandbox-quickbooks.api.intuit.com/v3";

/// Production accounting API base URL.
pub const PRODUCTION_API_BASE_URL: &str = "https://quickbooks.api.intuit.com/v3";

/// Default redirect URI, matching the one Intuit's OAuth playground registers.
pub const DEFAULT_REDIRECT_URI: &str = "https://developer.intuit.com/v2/OAuth2Playground/RedirectUrl";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default API minor version sent with every resource call.
pub const DEFAULT_MINOR_VERSION: u32 = 75;

// ─────────────────────────────────────────────────────────────────────────────
// Environment
// ─────────────────────────────────────────────────────────────────────────────

/// Which vendor environment the API calls go to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl Environment {
    /// Accounting API base URL for this environment.
    pub fn api_base_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => SANDBOX_API_BASE_URL,
            Environment::Production => PRODUCTION_API_BASE_URL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "development" | "dev" => Ok(Environment::Sandbox),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidValue {
                field: "environment".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Vendor environment.
    pub environment: Option<Environment>,

    /// OAuth client registration.
    pub oauth: Option<OAuthSection>,

    /// Accounting API settings.
    pub api: Option<ApiSection>,

    /// Session persistence settings.
    pub session: Option<SessionSection>,

    /// Log file settings.
    pub logging: Option<LoggingSection>,
}

impl LedgerConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// The `[oauth]` section merges field by field so that a client secret in
    /// the user config survives a project file that only sets the client id.
    /// Other sections are replaced whole.
    pub fn merge(&mut self, other: LedgerConfig) {
        if other.environment.is_some() {
            self.environment = other.environment;
        }

        if let Some(overlay) = other.oauth {
            match self.oauth.as_mut() {
                Some(base) => base.merge(overlay),
                None => self.oauth = Some(overlay),
            }
        }

        if other.api.is_some() {
            self.api = other.api;
        }
        if other.session.is_some() {
            self.session = other.session;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Effective environment (sandbox unless configured).
    pub fn environment(&self) -> Environment {
        self.environment.unwrap_or_default()
    }

    /// OAuth section, or defaults.
    pub fn oauth(&self) -> OAuthSection {
        self.oauth.clone().unwrap_or_default()
    }

    /// API section, or defaults.
    pub fn api(&self) -> ApiSection {
        self.api.clone().unwrap_or_default()
    }

    /// Base URL for resource calls: explicit override, else per environment.
    pub fn api_base_url(&self) -> String {
        self.api
            .as_ref()
            .and_then(|api| api.base_url.clone())
            .unwrap_or_else(|| self.environment().api_base_url().to_string())
    }

    /// Redirect URI registered with the identity platform.
    pub fn redirect_uri(&self) -> String {
        self.oauth
            .as_ref()
            .and_then(|oauth| oauth.redirect_uri.clone())
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string())
    }

    /// Explicit token file location, if configured.
    pub fn token_file(&self) -> Option<PathBuf> {
        self.session.as_ref().and_then(|s| s.token_file.clone())
    }

    /// Whether the config file carries a plaintext client secret.
    pub fn has_plaintext_secret(&self) -> bool {
        self.oauth
            .as_ref()
            .is_some_and(|oauth| oauth.client_secret.is_some())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OAuth Section
// ─────────────────────────────────────────────────────────────────────────────

/// OAuth client registration.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Prefer `LEDGERLINK_CLIENT_SECRET` over storing this in a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Override for the consent page (testing).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorize_url: Option<String>,
    /// Override for the token endpoint (testing).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
}

impl OAuthSection {
    fn merge(&mut self, other: OAuthSection) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            client_id,
            client_secret,
            redirect_uri,
            scope,
            authorize_url,
            token_url
        );
    }
}

impl std::fmt::Debug for OAuthSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSection")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Section
// ─────────────────────────────────────────────────────────────────────────────

/// Accounting API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Override the environment's base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// `minorversion` query parameter; `0` disables it.
    pub minor_version: u32,
    /// Timeout for every upstream request.
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: None,
            minor_version: DEFAULT_MINOR_VERSION,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiSection {
    /// Minor version to send, if any.
    pub fn minor_version(&self) -> Option<u32> {
        (self.minor_version > 0).then_some(self.minor_version)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session / Logging Sections
// ─────────────────────────────────────────────────────────────────────────────

/// Session persistence settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Where the CLI keeps the session snapshot. Defaults to the config dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
}

/// Log file settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Write a daily rolling JSON log file.
    pub file: bool,
    /// Log directory. Defaults to `<config dir>/logs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            file: true,
            directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = LedgerConfig::from_toml(
            r#"
environment = "production"

[oauth]
client_id = "client-abc"
redirect_uri = "https://example.com/callback"

[api]
minor_version = 70
timeout_secs = 10

[session]
token_file = "/tmp/session.json"

[logging]
file = false
"#,
        )
        .unwrap();

        assert_eq!(config.environment(), Environment::Production);
        assert_eq!(config.api_base_url(), PRODUCTION_API_BASE_URL);
        assert_eq!(config.redirect_uri(), "https://example.com/callback");
        assert_eq!(config.api().minor_version(), Some(70));
        assert_eq!(config.api().timeout_secs, 10);
        assert_eq!(config.token_file(), Some(PathBuf::from("/tmp/session.json")));
        assert!(!config.logging.unwrap().file);
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::new();
        assert_eq!(config.environment(), Environment::Sandbox);
        assert_eq!(config.api_base_url(), SANDBOX_API_BASE_URL);
        assert_eq!(config.redirect_uri(), DEFAULT_REDIRECT_URI);
        assert_eq!(config.api().minor_version(), Some(DEFAULT_MINOR_VERSION));
        assert_eq!(config.token_file(), None);
    }

    #[test]
    fn test_minor_version_zero_disables() {
        let config = LedgerConfig::from_toml("[api]\nminor_version = 0\n").unwrap();
        assert_eq!(config.api().minor_version(), None);
        assert_eq!(config.api().timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_base_url_override() {
        let config = LedgerConfig::from_toml(
            r#"
environment = "production"
[api]
base_url = "http://localhost:9000/v3"
"#,
        )
        .unwrap();
        assert_eq!(config.api_base_url(), "http://localhost:9000/v3");
    }

    #[test]
    fn test_merge_oauth_field_by_field() {
        let mut base = LedgerConfig::from_toml(
            r#"
[oauth]
client_id = "user-client"
client_secret = "user-secret"
"#,
        )
        .unwrap();
        let overlay = LedgerConfig::from_toml(
            r#"
environment = "production"
[oauth]
client_id = "project-client"
"#,
        )
        .unwrap();

        base.merge(overlay);
        let oauth = base.oauth();
        assert_eq!(oauth.client_id.as_deref(), Some("project-client"));
        assert_eq!(oauth.client_secret.as_deref(), Some("user-secret"));
        assert_eq!(base.environment(), Environment::Production);
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("Sandbox".parse::<Environment>().unwrap(), Environment::Sandbox);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let section = OAuthSection {
            client_id: Some("client-abc".to_string()),
            client_secret: Some("hunter2".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", section);
        assert!(debug.contains("client-abc"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = LedgerConfig {
            environment: Some(Environment::Production),
            oauth: Some(OAuthSection {
                client_id: Some("client-abc".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let parsed = LedgerConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
