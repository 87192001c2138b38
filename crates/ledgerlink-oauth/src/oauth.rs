//! OAuth 2.0 authorization code flow against the Intuit identity platform.

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use rand::RngCore;
use reqwest::header;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OAuthError, Result};
use crate::fault::UpstreamFault;

/// Consent page for the authorization code flow.
pub const AUTHORIZE_URL: &str = "https://appcenter.intuit.com/connect/oauth2";

/// Token endpoint for both code exchange and refresh.
pub const TOKEN_URL: &str = "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer";

/// Scope granting access to the accounting API.
pub const ACCOUNTING_SCOPE: &str = "com.intuit.quickbooks.accounting";

/// OAuth client registration.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub authorize_url: String,
    pub token_url: String,
}

impl OAuthConfig {
    /// Create a config for the production identity endpoints.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scope: ACCOUNTING_SCOPE.to_string(),
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Override the token endpoint (used against mock servers).
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Override the consent page URL.
    pub fn with_authorize_url(mut self, authorize_url: impl Into<String>) -> Self {
        self.authorize_url = authorize_url.into();
        self
    }

    /// Override the requested scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Fail unless both client id and secret are set.
    pub fn require_client_credentials(&self) -> Result<()> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(OAuthError::Config(
                "client_id and client_secret are required for token requests".to_string(),
            ));
        }
        Ok(())
    }

    /// `Authorization` header value for the token endpoint.
    pub fn basic_auth_header(&self) -> String {
        basic_auth_header(&self.client_id, &self.client_secret)
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// Build an HTTP Basic credential from client id and secret.
pub fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    let encoded = STANDARD.encode(format!("{}:{}", client_id, client_secret));
    format!("Basic {}", encoded)
}

/// Generate a random state string for CSRF protection.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Build the consent URL the user opens to authorize the app.
pub fn build_authorization_url(config: &OAuthConfig, state: &str) -> String {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("response_type", "code"),
        ("scope", config.scope.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("state", state),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.authorize_url, query)
}

/// Query parameters the identity platform appends to the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectParams {
    pub code: String,
    pub state: Option<String>,
    pub realm_id: Option<String>,
}

/// Parse the redirect URL (or bare query string) pasted back by the user.
pub fn parse_redirect(input: &str) -> Result<RedirectParams> {
    let trimmed = input.trim();
    let query = match Url::parse(trimmed) {
        Ok(url) => url.query().unwrap_or_default().to_string(),
        Err(_) => trimmed.trim_start_matches('?').to_string(),
    };

    let mut code = None;
    let mut state = None;
    let mut realm_id = None;
    let mut error = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "realmId" => realm_id = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(OAuthError::CodeExchange(format!(
            "authorization was denied: {}",
            error
        )));
    }

    match code {
        Some(code) if !code.is_empty() => Ok(RedirectParams {
            code,
            state,
            realm_id,
        }),
        _ => Err(OAuthError::CodeExchange(
            "redirect is missing the authorization code".to_string(),
        )),
    }
}

/// Token payload returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResult {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Lifetime of the refresh token in seconds.
    #[serde(
        default,
        rename = "x_refresh_token_expires_in",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token_expires_in: Option<u64>,
    #[serde(
        default,
        rename = "realmId",
        alias = "realm_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub realm_id: Option<String>,
}

/// Exchange an authorization code for tokens.
///
/// Non-success responses come back as [`OAuthError::Upstream`]; the session
/// decides how much of the vendor fault to expose.
pub async fn exchange_code_for_tokens(
    http: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<TokenResult> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];
    post_token_request(http, config, &form).await
}

/// Mint a new access token from a refresh token.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    config: &OAuthConfig,
    refresh_token: &str,
) -> Result<TokenResult> {
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];
    post_token_request(http, config, &form).await
}

async fn post_token_request(
    http: &reqwest::Client,
    config: &OAuthConfig,
    form: &[(&str, &str)],
) -> Result<TokenResult> {
    config.require_client_credentials()?;

    let response = http
        .post(&config.token_url)
        .header(header::AUTHORIZATION, config.basic_auth_header())
        .header(header::ACCEPT, "application/json")
        .form(form)
        .send()
        .await
        .map_err(|e| OAuthError::Network(format!("Token request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| OAuthError::Network(format!("Failed to read token response: {}", e)))?;

    if !status.is_success() {
        return Err(OAuthError::Upstream(UpstreamFault::from_body(
            status.as_u16(),
            &body,
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| OAuthError::Serialization(format!("Failed to parse token response: {}", e)))
}
