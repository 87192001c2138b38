//! Ledgerlink - command-line access to the QuickBooks Online accounting API
//!
//! Main entry point for the ledgerlink CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ledgerlink_config::Environment;

mod commands;

use commands::{accounts, auth, company, config, customers, invoices, items, payments};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Ledgerlink - QuickBooks Online from the command line
#[derive(Parser)]
#[command(name = "ledgerlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding config.toml, the session file and logs
    #[arg(long, global = true, env = "LEDGERLINK_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Vendor environment (sandbox or production)
    #[arg(long, global = true)]
    pub environment: Option<Environment>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect a company and manage the stored session
    Auth(auth::AuthArgs),

    /// Customer records
    Customers(customers::CustomersArgs),

    /// Products and services
    Items(items::ItemsArgs),

    /// Chart of accounts
    Accounts(accounts::AccountsArgs),

    /// Invoices
    Invoices(invoices::InvoicesArgs),

    /// Received payments
    Payments(payments::PaymentsArgs),

    /// Show the connected company's profile
    Company,

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded =
        ledgerlink_config::load_config_with_options(None, cli.config_dir.as_deref())?;
    let mut config = loaded.config;
    if let Some(environment) = cli.environment {
        config.environment = Some(environment);
    }

    let config_dir = cli
        .config_dir
        .clone()
        .or_else(ledgerlink_config::xdg_config_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    // Initialize tracing: console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "ledgerlink=debug,ledgerlink_client=debug,ledgerlink_oauth=debug,ledgerlink_config=debug,info"
    } else {
        "ledgerlink=warn,ledgerlink_client=warn,ledgerlink_oauth=warn,warn"
    };

    let logging = config.logging.clone().unwrap_or_default();
    let (file_layer, _guard) = if logging.file {
        let log_dir = logging
            .directory
            .clone()
            .unwrap_or_else(|| config_dir.join("logs"));
        let file_appender = tracing_appender::rolling::daily(&log_dir, "ledgerlink.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        (Some(non_blocking), Some(guard))
    } else {
        (None, None)
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_layer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "ledgerlink=trace,ledgerlink_client=trace,ledgerlink_oauth=trace,ledgerlink_config=trace,info",
                ))
        }))
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::debug!(sources = ?loaded.sources, environment = %config.environment(), "Configuration loaded");

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config,
        config_dir,
        config_source: loaded.source.map(|s| s.path),
    };

    match cli.command {
        Commands::Auth(args) => auth::run(args, &ctx).await,
        Commands::Customers(args) => customers::run(args, &ctx).await,
        Commands::Items(args) => items::run(args, &ctx).await,
        Commands::Accounts(args) => accounts::run(args, &ctx).await,
        Commands::Invoices(args) => invoices::run(args, &ctx).await,
        Commands::Payments(args) => payments::run(args, &ctx).await,
        Commands::Company => company::run(&ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
