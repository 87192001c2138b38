//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use ledgerlink_config::{CLIENT_ID_ENV, CLIENT_SECRET_ENV};

use super::{Context, print_json};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./ledgerlink.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local } => cmd_init(ctx, local),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    let oauth = config.oauth();
    let api = config.api();

    let credential_status = match config.client_credentials() {
        Ok(creds) => format!(
            "client id from {}, secret from {}",
            creds.client_id.source, creds.client_secret.source
        ),
        Err(e) => format!("missing ({})", e),
    };
    let session_file = ctx.session_file();

    if ctx.json_output {
        return print_json(&serde_json::json!({
            "environment": config.environment(),
            "api_base_url": config.api_base_url(),
            "minor_version": api.minor_version(),
            "timeout_secs": api.timeout_secs,
            "redirect_uri": config.redirect_uri(),
            "scope": oauth.scope,
            "credentials": credential_status,
            "session_file": session_file,
            "config_file": ctx.config_source,
        }));
    }

    println!("# Ledgerlink Configuration\n");

    match &ctx.config_source {
        Some(path) => println!("Config file: {}\n", path.display()),
        None => println!("No config files loaded (using defaults)\n"),
    }

    println!("Environment:   {}", config.environment());
    println!("API base URL:  {}", config.api_base_url());
    println!(
        "Minor version: {}",
        api.minor_version()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!("Timeout:       {}s", api.timeout_secs);
    println!("Redirect URI:  {}", config.redirect_uri());
    if let Some(scope) = &oauth.scope {
        println!("Scope:         {}", scope);
    }
    println!("Credentials:   {}", credential_status);
    println!("Session file:  {}", session_file.display());

    if ctx.verbose {
        let mut redacted = config.clone();
        if let Some(oauth) = redacted.oauth.as_mut()
            && oauth.client_secret.is_some()
        {
            oauth.client_secret = Some("********".to_string());
        }
        println!("\n---\nRaw config:\n");
        if let Ok(toml_str) = redacted.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = ledgerlink_config::load_config_with_options(None, Some(&ctx.config_dir))?;

    println!("Config file search order (later overrides earlier):\n");
    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'ledgerlink config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

fn cmd_init(ctx: &Context, local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("ledgerlink.toml")
    } else {
        std::fs::create_dir_all(&ctx.config_dir)?;
        ctx.config_dir.join("config.toml")
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    let template = format!(
        r#"# Ledgerlink Configuration

# sandbox or production
environment = "sandbox"

[oauth]
# Prefer the {id} / {secret} environment variables.
# client_id = ""
redirect_uri = "http://localhost:8080/callback"
# scope = "com.intuit.quickbooks.accounting"

[api]
# minor_version = 75
timeout_secs = 30

[logging]
file = true
"#,
        id = CLIENT_ID_ENV,
        secret = CLIENT_SECRET_ENV,
    );

    std::fs::write(&path, template)?;
    println!("✓ Created config file: {}", path.display());
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let path = ctx.config_dir.join("config.toml");
    println!("{}", path.display());
    if !path.exists() {
        println!("(file does not exist yet; run 'ledgerlink config init')");
    }
    Ok(())
}
