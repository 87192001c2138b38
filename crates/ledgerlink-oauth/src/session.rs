//! Token session: credential state and the authenticated-call protocol.
//!
//! One [`TokenSession`] holds the credentials for one company (realm). It is
//! shared by reference (`Arc<TokenSession>`) with every caller; all
//! authentication operations mutate it in place.
//!
//! Every resource call goes through [`TokenSession::authenticated_call`]:
//!
//! 1. [`TokenSession::ensure_fresh`] refreshes a stale access token when a
//!    refresh token is on file.
//! 2. The request is sent with the access token as a bearer credential.
//! 3. On an authentication failure (HTTP 401 or fault code 3200) the session
//!    refreshes once and retries once. Nothing else is retried.
//!
//! Refreshes are serialized through a gate. A caller that waited on the gate
//! re-reads the state and skips its own refresh when another caller already
//! rotated the access token.

use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::error::{OAuthError, Result};
use crate::fault::UpstreamFault;
use crate::oauth::{self, OAuthConfig, TokenResult};

/// Safety margin before the recorded expiry at which a token counts as stale.
const EXPIRY_MARGIN_SECS: i64 = 5 * 60;

/// Refresh tokens closer than this to their advisory expiry get a warning.
const REFRESH_TOKEN_WARNING_DAYS: i64 = 14;

/// Upper bound for vendor-declared lifetimes (100 years).
const MAX_LIFETIME_SECS: u64 = 100 * 365 * 24 * 60 * 60;

// ============================================================================
// Session state
// ============================================================================

/// Credentials held by a session.
///
/// Also the persistence format: callers that keep sessions across process
/// restarts store this and hand it back through [`TokenSession::restore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expiry: Option<DateTime<Utc>>,
    /// Advisory only; never enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_expiry: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    /// Authenticated iff both an access token and a tenant are present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.tenant_id.is_some()
    }

    /// Expiry check against an explicit clock.
    ///
    /// A missing access token with a refresh token on file counts as expired
    /// so that a refresh is attempted instead of sending an empty credential.
    /// A missing expiry counts as not expired. The margin boundary is
    /// inclusive.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_none() {
            return self.refresh_token.is_some();
        }
        match self.access_token_expiry {
            Some(expiry) => expiry <= now + Duration::seconds(EXPIRY_MARGIN_SECS),
            None => false,
        }
    }

    /// Read-only status view.
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            authenticated: self.is_authenticated(),
            tenant_id: self.tenant_id.clone(),
            access_token_expiry: self.access_token_expiry,
            has_refresh_token: self.refresh_token.is_some(),
            refresh_token_expiry: self.refresh_token_expiry,
        }
    }

    fn write_credentials(
        &mut self,
        access_token: String,
        tenant_id: Option<String>,
        refresh_token: Option<String>,
        expires_in: Option<u64>,
    ) {
        let now = Utc::now();
        self.access_token = Some(access_token);
        self.tenant_id = tenant_id;
        self.refresh_token = refresh_token;
        self.access_token_expiry = expires_in.map(|secs| now + seconds(secs));
        self.refresh_token_expiry = None;
    }
}

/// Session status as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub tenant_id: Option<String>,
    pub access_token_expiry: Option<DateTime<Utc>>,
    pub has_refresh_token: bool,
    pub refresh_token_expiry: Option<DateTime<Utc>>,
}

impl SessionStatus {
    /// Human-readable remaining lifetime of the access token.
    pub fn expires_in_display(&self, now: DateTime<Utc>) -> String {
        match self.access_token_expiry {
            None => "unknown".to_string(),
            Some(expiry) if expiry <= now => "Expired (will refresh on next use)".to_string(),
            Some(expiry) => {
                let remaining = (expiry - now).num_seconds();
                format!("{}h {}m", remaining / 3600, (remaining % 3600) / 60)
            }
        }
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_LIFETIME_SECS) as i64)
}

// ============================================================================
// Requests
// ============================================================================

/// A resource call routed through the session.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url, body: Value) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    /// Append a query-string parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A successful upstream response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body, `Null` when the body was empty.
    pub body: Value,
}

// ============================================================================
// TokenSession
// ============================================================================

/// Process-wide credential holder for the accounting API.
#[derive(Debug)]
pub struct TokenSession {
    http: reqwest::Client,
    config: OAuthConfig,
    state: RwLock<SessionSnapshot>,
    refresh_gate: Mutex<()>,
}

impl TokenSession {
    /// Create an empty session with a default HTTP client.
    pub fn new(config: OAuthConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Create an empty session using the given HTTP client. The client's
    /// timeout bounds every token and resource request.
    pub fn with_http_client(config: OAuthConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            config,
            state: RwLock::new(SessionSnapshot::default()),
            refresh_gate: Mutex::new(()),
        }
    }

    /// OAuth client registration used for token requests.
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Replace the whole session state with a previously saved snapshot.
    pub async fn restore(&self, snapshot: SessionSnapshot) {
        let mut state = self.state.write().await;
        *state = snapshot;
        tracing::debug!(
            authenticated = state.is_authenticated(),
            "Session restored from snapshot"
        );
    }

    /// Copy of the current session state.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.clone()
    }

    /// Overwrite the credentials unconditionally.
    ///
    /// Tokens are not validated; a bad token surfaces on the next upstream
    /// call. Without `expires_in` the expiry is cleared (unknown). The
    /// refresh-token expiry is always cleared.
    pub async fn set_credentials(
        &self,
        access_token: impl Into<String>,
        tenant_id: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<u64>,
    ) {
        let tenant_id = tenant_id.into();
        let mut state = self.state.write().await;
        state.write_credentials(
            access_token.into(),
            Some(tenant_id.clone()),
            refresh_token,
            expires_in,
        );
        tracing::info!(tenant_id = %tenant_id, "Session credentials set");
    }

    /// Current status. No side effects.
    pub async fn status(&self) -> SessionStatus {
        self.state.read().await.status()
    }

    /// Whether the access token should be refreshed before use.
    pub async fn is_expired(&self) -> bool {
        self.state.read().await.is_expired_at(Utc::now())
    }

    /// Tenant (realm) id the session is scoped to.
    pub async fn tenant_id(&self) -> Option<String> {
        self.state.read().await.tenant_id.clone()
    }

    /// Tenant id, or [`OAuthError::AuthConfig`] when none is established.
    pub async fn require_tenant(&self) -> Result<String> {
        self.tenant_id().await.ok_or_else(|| {
            OAuthError::AuthConfig(
                "no company connected; complete the authorization flow first".to_string(),
            )
        })
    }

    /// Refresh the access token if it is stale and a refresh token is on file.
    ///
    /// Without a refresh token this is a no-op and the call is left to fail
    /// upstream. A refresh rejected with HTTP 400/401 becomes the terminal
    /// [`OAuthError::AuthExpired`]; other failures propagate unchanged.
    pub async fn ensure_fresh(&self) -> Result<()> {
        {
            let state = self.state.read().await;
            if state.refresh_token.is_none() || !state.is_expired_at(Utc::now()) {
                return Ok(());
            }
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited.
        let refresh_token = {
            let state = self.state.read().await;
            if !state.is_expired_at(Utc::now()) {
                return Ok(());
            }
            match state.refresh_token.clone() {
                Some(token) => token,
                None => return Ok(()),
            }
        };

        tracing::info!("Access token expired, refreshing");
        match self.refresh_locked(&refresh_token).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_refresh_rejected() => Err(reauthentication_required(&e)),
            Err(e) => Err(e),
        }
    }

    /// Exchange an authorization code for tokens and store them.
    ///
    /// The tenant is `realm_id` when given, else the realm id returned by the
    /// token endpoint, else the tenant already on file. Any failure of the
    /// exchange itself is reported as a generic [`OAuthError::CodeExchange`];
    /// the vendor detail is only logged.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        realm_id: Option<&str>,
    ) -> Result<TokenResult> {
        let mut result = oauth::exchange_code_for_tokens(&self.http, &self.config, code)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Authorization code exchange failed");
                match e {
                    OAuthError::Config(msg) => OAuthError::Config(msg),
                    _ => OAuthError::CodeExchange(
                        "could not exchange the authorization code; restart the authorization flow"
                            .to_string(),
                    ),
                }
            })?;

        let tenant_id = match realm_id {
            Some(id) => Some(id.to_string()),
            None => match result.realm_id.clone() {
                Some(id) => Some(id),
                None => self.tenant_id().await,
            },
        };
        let tenant_id = tenant_id.ok_or_else(|| {
            OAuthError::AuthConfig(
                "token response carried no realm id; pass the realmId from the redirect"
                    .to_string(),
            )
        })?;

        result.realm_id = Some(tenant_id);
        self.apply_token_result(&result).await;
        tracing::info!("Authorization code exchanged");
        Ok(result)
    }

    /// Mint a new access token from `refresh_token` and store the result.
    ///
    /// When the vendor omits a new refresh token the given one is kept. The
    /// tenant falls back to the one already on file.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResult> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked(refresh_token).await
    }

    /// Refresh using the stored refresh token.
    pub async fn refresh_stored(&self) -> Result<TokenResult> {
        let _gate = self.refresh_gate.lock().await;
        let refresh_token = self.state.read().await.refresh_token.clone();
        let refresh_token = refresh_token.ok_or_else(|| {
            OAuthError::AuthConfig("no refresh token on file".to_string())
        })?;
        self.refresh_locked(&refresh_token).await
    }

    /// Send `request` with the session's credentials.
    ///
    /// At most one retry, triggered only by an authentication failure and
    /// only when a refresh token exists. When the retry fails too, its error
    /// is the one returned.
    pub async fn authenticated_call(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.ensure_fresh().await?;

        let token = self.access_token().await;
        match self.send(request, token.as_deref()).await {
            Ok(response) => Ok(response),
            Err(err) if err.is_auth_failure() => {
                self.retry_after_auth_failure(request, token, err).await
            }
            Err(err) => Err(err),
        }
    }

    async fn retry_after_auth_failure(
        &self,
        request: &ApiRequest,
        used_token: Option<String>,
        original: OAuthError,
    ) -> Result<ApiResponse> {
        {
            let _gate = self.refresh_gate.lock().await;
            let (current_token, refresh_token) = {
                let state = self.state.read().await;
                (state.access_token.clone(), state.refresh_token.clone())
            };

            let Some(refresh_token) = refresh_token else {
                return Err(original);
            };

            if current_token == used_token {
                tracing::info!("Upstream rejected the access token, refreshing before retry");
                match self.refresh_locked(&refresh_token).await {
                    Ok(_) => {}
                    Err(e) if e.is_refresh_rejected() => {
                        return Err(reauthentication_required(&e));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Refresh after authentication failure failed");
                        return Err(original);
                    }
                }
            } else {
                tracing::debug!("Access token rotated by a concurrent refresh, retrying");
            }
        }

        let token = self.access_token().await;
        self.send(request, token.as_deref()).await
    }

    async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token.clone()
    }

    /// Refresh; the caller holds the refresh gate.
    async fn refresh_locked(&self, refresh_token: &str) -> Result<TokenResult> {
        let mut result = oauth::refresh_access_token(&self.http, &self.config, refresh_token)
            .await
            .map_err(|e| match e {
                OAuthError::Upstream(fault) => {
                    tracing::warn!(status = fault.status, fault = %fault, "Token refresh rejected");
                    OAuthError::RefreshFailed {
                        status: Some(fault.status),
                        message: fault.message,
                    }
                }
                OAuthError::Config(msg) => OAuthError::Config(msg),
                other => OAuthError::RefreshFailed {
                    status: None,
                    message: other.to_string(),
                },
            })?;

        if result.refresh_token.as_deref().is_none_or(str::is_empty) {
            result.refresh_token = Some(refresh_token.to_string());
        }
        if result.realm_id.is_none() {
            result.realm_id = self.tenant_id().await;
        }

        self.apply_token_result(&result).await;
        tracing::info!("Token refreshed successfully");
        Ok(result)
    }

    async fn apply_token_result(&self, result: &TokenResult) {
        let now = Utc::now();
        let mut state = self.state.write().await;
        // A refresh token kept from before keeps its known expiry.
        let kept_expiry = match (&state.refresh_token, &result.refresh_token) {
            (Some(old), Some(new)) if old == new => state.refresh_token_expiry,
            _ => None,
        };
        state.write_credentials(
            result.access_token.clone(),
            result.realm_id.clone(),
            result.refresh_token.clone(),
            result.expires_in,
        );
        state.refresh_token_expiry = kept_expiry;

        if let Some(secs) = result.refresh_token_expires_in {
            let expiry = now + seconds(secs);
            state.refresh_token_expiry = Some(expiry);
            if expiry - now < Duration::days(REFRESH_TOKEN_WARNING_DAYS) {
                tracing::warn!(
                    refresh_token_expiry = %expiry,
                    "Refresh token expires soon; re-authorize to avoid interruption"
                );
            }
        }
    }

    async fn send(&self, request: &ApiRequest, access_token: Option<&str>) -> Result<ApiResponse> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .header(header::ACCEPT, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, url = %request.url, "Sending upstream request");
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let fault = UpstreamFault::from_body(status.as_u16(), &text);
            tracing::debug!(status = status.as_u16(), fault = %fault, "Upstream request failed");
            return Err(OAuthError::Upstream(fault));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                OAuthError::Serialization(format!("Failed to parse upstream response: {}", e))
            })?
        };

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn reauthentication_required(cause: &OAuthError) -> OAuthError {
    tracing::warn!(error = %cause, "Refresh token rejected; re-authorization required");
    OAuthError::AuthExpired(format!(
        "the refresh token was rejected ({}); authorize the app again",
        cause
    ))
}
