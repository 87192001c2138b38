//! Auth command - connect a company and manage the stored session.

use std::io::Write;

use anyhow::{Result, anyhow};
use chrono::Utc;
use clap::{Args, Subcommand};
use console::Style;
use ledgerlink_oauth::oauth::{build_authorization_url, generate_state, parse_redirect};
use ledgerlink_oauth::{SessionStatus, TokenResult};

use super::{Connection, Context, print_json, print_success};

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Authorize access to a company through the browser consent page
    Login,

    /// Print the consent page URL without waiting for the redirect
    Url,

    /// Exchange an authorization code (or the full redirect URL) for tokens
    Exchange {
        /// Redirect URL, its query string, or a bare authorization code
        input: String,

        /// Company (realm) id; overrides the one in the redirect
        #[arg(long)]
        realm_id: Option<String>,

        /// Expected `state` value; the redirect must carry the same one
        #[arg(long)]
        state: Option<String>,
    },

    /// Store tokens obtained elsewhere
    Set {
        /// Access token
        #[arg(long)]
        access_token: String,

        /// Company (realm) id
        #[arg(long)]
        realm_id: String,

        /// Refresh token
        #[arg(long)]
        refresh_token: Option<String>,

        /// Access token lifetime in seconds
        #[arg(long)]
        expires_in: Option<u64>,
    },

    /// Mint a new access token from the stored refresh token
    Refresh,

    /// Show session status
    Status,

    /// Remove the stored session
    Logout,
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AuthCommand::Login => cmd_login(ctx).await,
        AuthCommand::Url => cmd_url(ctx),
        AuthCommand::Exchange {
            input,
            realm_id,
            state,
        } => cmd_exchange(ctx, &input, realm_id, state.as_deref()).await,
        AuthCommand::Set {
            access_token,
            realm_id,
            refresh_token,
            expires_in,
        } => cmd_set(ctx, access_token, realm_id, refresh_token, expires_in).await,
        AuthCommand::Refresh => cmd_refresh(ctx).await,
        AuthCommand::Status => cmd_status(ctx).await,
        AuthCommand::Logout => cmd_logout(ctx).await,
    }
}

async fn cmd_login(ctx: &Context) -> Result<()> {
    ctx.config.client_credentials()?;

    let connection = Connection::open(ctx).await?;
    let status = connection.session.status().await;
    if status.authenticated && !connection.session.is_expired().await {
        println!(
            "Already connected to company {} (expires in {})",
            status.tenant_id.as_deref().unwrap_or("-"),
            status.expires_in_display(Utc::now())
        );
        println!("Run 'ledgerlink auth logout' first to connect another company.");
        return Ok(());
    }

    let state = generate_state();
    let auth_url = build_authorization_url(connection.session.config(), &state);

    println!("QuickBooks Online Authorization");
    println!("===============================");
    println!();
    println!("Open this URL in your browser:");
    println!();
    println!("  {}", auth_url);
    println!();
    println!("After approving access you will be redirected.");
    println!("Copy the full URL from the address bar and paste it here:");
    println!();

    if open_url(&auth_url).is_err() {
        println!("(Could not open browser automatically)");
        println!();
    }

    print!("redirect> ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let input = input.trim();

    if input.is_empty() {
        println!("No input provided, aborting.");
        return Ok(());
    }

    let result = exchange(&connection, input, None, Some(&state)).await;
    let result = connection.finish(result).await?;
    report_connected(ctx, &result)
}

fn cmd_url(ctx: &Context) -> Result<()> {
    ctx.config.client_credentials()?;

    let state = generate_state();
    let url = build_authorization_url(&ctx.oauth_config(), &state);

    if ctx.json_output {
        print_json(&serde_json::json!({ "url": url, "state": state }))
    } else {
        println!("{}", url);
        println!();
        println!("state: {}", state);
        println!("Then run: ledgerlink auth exchange '<redirect url>' --state {}", state);
        Ok(())
    }
}

async fn cmd_exchange(
    ctx: &Context,
    input: &str,
    realm_id: Option<String>,
    state: Option<&str>,
) -> Result<()> {
    ctx.config.client_credentials()?;

    let connection = Connection::open(ctx).await?;
    let result = exchange(&connection, input, realm_id, state).await;
    let result = connection.finish(result).await?;
    report_connected(ctx, &result)
}

/// Parse the pasted redirect (or bare code) and exchange it.
async fn exchange(
    connection: &Connection,
    input: &str,
    realm_override: Option<String>,
    expected_state: Option<&str>,
) -> Result<TokenResult> {
    let (code, realm_id) = if input.contains("code=") {
        let params = parse_redirect(input)?;
        if let Some(expected) = expected_state
            && params.state.as_deref() != Some(expected)
        {
            return Err(anyhow!(
                "State mismatch: the redirect does not belong to this authorization request"
            ));
        }
        (params.code, realm_override.or(params.realm_id))
    } else {
        (input.to_string(), realm_override)
    };

    Ok(connection
        .session
        .exchange_authorization_code(&code, realm_id.as_deref())
        .await?)
}

async fn cmd_set(
    ctx: &Context,
    access_token: String,
    realm_id: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
) -> Result<()> {
    let connection = Connection::open(ctx).await?;
    connection
        .session
        .set_credentials(access_token, realm_id, refresh_token, expires_in)
        .await;
    let status = connection.session.status().await;
    connection.finish(Ok(())).await?;

    if ctx.json_output {
        print_json(&status)
    } else {
        print_success(ctx, "Session credentials stored");
        print_status(&status);
        Ok(())
    }
}

async fn cmd_refresh(ctx: &Context) -> Result<()> {
    ctx.config.client_credentials()?;

    let connection = Connection::open(ctx).await?;
    let result = connection
        .session
        .refresh_stored()
        .await
        .map_err(anyhow::Error::from);
    let result = connection.finish(result).await?;

    if ctx.json_output {
        print_json(&serde_json::json!({
            "realm_id": result.realm_id,
            "expires_in": result.expires_in,
            "refresh_token_expires_in": result.refresh_token_expires_in,
        }))
    } else {
        print_success(ctx, "Access token refreshed");
        Ok(())
    }
}

async fn cmd_status(ctx: &Context) -> Result<()> {
    let connection = Connection::open(ctx).await?;
    let status = connection.session.status().await;

    if ctx.json_output {
        return print_json(&status);
    }

    println!("Session Status");
    println!("--------------");
    print_status(&status);
    if !status.authenticated {
        println!();
        println!("  Run 'ledgerlink auth login' to connect a company");
    }
    Ok(())
}

async fn cmd_logout(ctx: &Context) -> Result<()> {
    let connection = Connection::open(ctx).await?;
    if connection.delete().await? {
        print_success(ctx, "Session removed");
    } else if !ctx.json_output {
        println!("No stored session found.");
    }
    Ok(())
}

fn report_connected(ctx: &Context, result: &TokenResult) -> Result<()> {
    if ctx.json_output {
        return print_json(&serde_json::json!({
            "realm_id": result.realm_id,
            "expires_in": result.expires_in,
            "refresh_token_expires_in": result.refresh_token_expires_in,
        }));
    }

    println!();
    print_success(
        ctx,
        format!(
            "Connected to company {}",
            result.realm_id.as_deref().unwrap_or("-")
        ),
    );
    if let Some(secs) = result.expires_in {
        println!("Access token expires in: {} seconds", secs);
    }
    Ok(())
}

fn print_status(status: &SessionStatus) {
    let now = Utc::now();
    let dim = Style::new().dim();
    let state = if status.authenticated {
        Style::new().green().apply_to("connected")
    } else {
        Style::new().yellow().apply_to("not connected")
    };

    println!("{:<16} {}", dim.apply_to("Session:"), state);
    println!(
        "{:<16} {}",
        dim.apply_to("Company:"),
        status.tenant_id.as_deref().unwrap_or("-")
    );
    println!(
        "{:<16} {}",
        dim.apply_to("Access token:"),
        status.expires_in_display(now)
    );
    println!(
        "{:<16} {}",
        dim.apply_to("Refresh token:"),
        match (status.has_refresh_token, status.refresh_token_expiry) {
            (false, _) => "none".to_string(),
            (true, None) => "present".to_string(),
            (true, Some(expiry)) => format!("present, expires {}", expiry.format("%Y-%m-%d")),
        }
    );
}

/// Try to open a URL in the default browser.
fn open_url(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).status()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).status()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .status()?;
    }
    Ok(())
}
