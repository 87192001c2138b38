//! CLI command handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use console::{Style, style};
use ledgerlink_client::{ListParams, Page, QuickBooksClient};
use ledgerlink_config::LedgerConfig;
use ledgerlink_oauth::token_store::TOKEN_FILE;
use ledgerlink_oauth::{FileTokenStore, OAuthConfig, SharedTokenStore, TokenSession};
use serde::Serialize;

pub mod accounts;
pub mod auth;
pub mod company;
pub mod config;
pub mod customers;
pub mod invoices;
pub mod items;
pub mod payments;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Merged configuration.
    pub config: LedgerConfig,
    /// User config directory (session file and logs default here).
    pub config_dir: PathBuf,
    /// First config file that was loaded, if any.
    pub config_source: Option<PathBuf>,
}

impl Context {
    /// OAuth settings for the session.
    ///
    /// Missing client credentials are left empty: only the token endpoint
    /// needs them, and the session reports that when it gets there.
    pub fn oauth_config(&self) -> OAuthConfig {
        let (client_id, client_secret) = match self.config.client_credentials() {
            Ok(creds) => (creds.client_id.value, creds.client_secret.value),
            Err(e) => {
                tracing::debug!(error = %e, "Client credentials unavailable");
                let oauth = self.config.oauth();
                (
                    oauth.client_id.unwrap_or_default(),
                    oauth.client_secret.unwrap_or_default(),
                )
            }
        };

        let oauth = self.config.oauth();
        let mut config = OAuthConfig::new(client_id, client_secret, self.config.redirect_uri());
        if let Some(scope) = oauth.scope {
            config = config.with_scope(scope);
        }
        if let Some(url) = oauth.authorize_url {
            config = config.with_authorize_url(url);
        }
        if let Some(url) = oauth.token_url {
            config = config.with_token_url(url);
        }
        config
    }

    /// Where the session snapshot lives.
    pub fn session_file(&self) -> PathBuf {
        self.config
            .token_file()
            .unwrap_or_else(|| self.config_dir.join(TOKEN_FILE))
    }

    pub fn token_store(&self) -> SharedTokenStore {
        Arc::new(FileTokenStore::with_path(self.session_file()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection
// ─────────────────────────────────────────────────────────────────────────────

/// A session restored from the token store, saved back by [`Connection::finish`].
pub struct Connection {
    pub session: Arc<TokenSession>,
    store: SharedTokenStore,
}

impl Connection {
    /// Build the session and restore the stored snapshot, if any.
    pub async fn open(ctx: &Context) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(ctx.config.api().timeout_secs))
            .user_agent(format!("ledgerlink/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        let session = Arc::new(TokenSession::with_http_client(ctx.oauth_config(), http));
        Self::restore(session, ctx.token_store()).await
    }

    /// Restore `session` from `store`, which [`Connection::finish`] saves back to.
    pub async fn restore(session: Arc<TokenSession>, store: SharedTokenStore) -> Result<Self> {
        if let Some(snapshot) = store
            .load()
            .await
            .context("Failed to read the stored session")?
        {
            session.restore(snapshot).await;
        }

        Ok(Self { session, store })
    }

    /// Accounting client over this session.
    pub fn client(&self, ctx: &Context) -> Result<QuickBooksClient> {
        QuickBooksClient::builder()
            .session(self.session.clone())
            .base_url(ctx.config.api_base_url())
            .minor_version(ctx.config.api().minor_version())
            .build()
            .context("Failed to build accounting client")
    }

    /// Persist the session (tokens may have been refreshed even when the
    /// command failed) and pass `result` through.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        let snapshot = self.session.snapshot().await;
        if snapshot.access_token.is_some()
            && let Err(e) = self.store.save(&snapshot).await
        {
            tracing::warn!(error = %e, "Failed to save session");
            if result.is_ok() {
                return Err(e).context("Failed to save session");
            }
        }
        result
    }

    pub async fn delete(&self) -> Result<bool> {
        if !self.store.exists() {
            return Ok(false);
        }
        self.store.delete().await.context("Failed to delete session")?;
        Ok(true)
    }
}

/// Open a connection, run `f` against the accounting client, and persist
/// the session afterwards.
pub async fn with_client<T, F, Fut>(ctx: &Context, f: F) -> Result<T>
where
    F: FnOnce(QuickBooksClient) -> Fut,
    Fut: std::future::Future<Output = ledgerlink_client::Result<T>>,
{
    let connection = Connection::open(ctx).await?;
    let client = connection.client(ctx)?;
    let result = f(client).await.map_err(anyhow::Error::from);
    connection.finish(result).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared arguments and output
// ─────────────────────────────────────────────────────────────────────────────

/// Paging flags shared by every `list` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Rows per page (1-1000)
    #[arg(long, default_value = "20")]
    pub page_size: u32,

    /// Substring to search for
    #[arg(short, long)]
    pub search: Option<String>,

    /// Include inactive records
    #[arg(long)]
    pub include_inactive: bool,
}

impl From<ListArgs> for ListParams {
    fn from(args: ListArgs) -> Self {
        let mut params = ListParams::default()
            .page(args.page)
            .page_size(args.page_size)
            .include_inactive(args.include_inactive);
        if let Some(search) = args.search {
            params = params.search(search);
        }
        params
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a page as JSON, or as a titled list of one-line rows.
pub fn print_page<T: Serialize>(
    ctx: &Context,
    title: &str,
    page: &Page<T>,
    row: impl Fn(&T) -> String,
) -> Result<()> {
    if ctx.json_output {
        return print_json(page);
    }

    let dim = Style::new().dim();
    println!("{}", style(title).bold());
    println!("{}", dim.apply_to("─".repeat(50)));

    if page.items.is_empty() {
        println!("{}", dim.apply_to("No records found"));
    } else {
        for item in &page.items {
            println!("{}", row(item));
        }
    }

    println!();
    println!(
        "{}",
        dim.apply_to(format!(
            "Page {} of {} ({} total)",
            page.page,
            page.total_pages().max(1),
            page.total_count
        ))
    );
    Ok(())
}

/// Print a single record as JSON, or as labelled fields.
pub fn print_record<T: Serialize>(ctx: &Context, record: &T, fields: &[(&str, String)]) -> Result<()> {
    if ctx.json_output {
        return print_json(record);
    }
    let dim = Style::new().dim();
    for (label, value) in fields {
        println!("{:<14} {}", dim.apply_to(format!("{}:", label)), value);
    }
    Ok(())
}

/// Print a one-line success message (suppressed in JSON mode).
pub fn print_success(ctx: &Context, message: impl std::fmt::Display) {
    if !ctx.json_output {
        println!("{} {}", Style::new().green().apply_to("✓"), message);
    }
}

/// Render an optional field for display.
pub fn show<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string())
}

pub fn money(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string())
}
