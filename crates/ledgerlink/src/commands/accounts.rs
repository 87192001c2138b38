//! Accounts command - chart of accounts.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;
use ledgerlink_client::{Account, AccountType};

use super::{Context, ListArgs, money, print_json, print_page, print_record, print_success, show, with_client};

/// Arguments for the accounts command.
#[derive(Args, Debug)]
pub struct AccountsArgs {
    #[command(subcommand)]
    pub command: AccountsCommand,
}

#[derive(Subcommand, Debug)]
pub enum AccountsCommand {
    /// List accounts
    List(ListArgs),

    /// Show an account
    Get {
        /// Account ID
        id: String,
    },

    /// Create an account
    Create {
        /// Account name (must be unique)
        name: String,

        /// Account type, e.g. "Income" or "Other Current Asset"
        #[arg(long = "type")]
        account_type: AccountType,

        /// Description
        #[arg(long)]
        description: Option<String>,
    },

    /// Return the account with this name, creating it if missing
    Resolve {
        /// Account name
        name: String,

        /// Type used when the account has to be created
        #[arg(long = "type", default_value = "Income")]
        account_type: AccountType,
    },
}

/// Run the accounts command.
pub async fn run(args: AccountsArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AccountsCommand::List(list) => {
            let page = with_client(ctx, |client| async move {
                client.accounts().list(list.into()).await
            })
            .await?;
            print_page(ctx, "Accounts", &page, row)
        }
        AccountsCommand::Get { id } => {
            let account =
                with_client(ctx, |client| async move { client.accounts().get(&id).await })
                    .await?;
            print_account(ctx, &account)
        }
        AccountsCommand::Create {
            name,
            account_type,
            description,
        } => {
            let mut account = Account::new(name, account_type);
            account.description = description;
            let created = with_client(ctx, |client| async move {
                client.accounts().create(&account).await
            })
            .await?;
            print_success(ctx, format!("Account created: {}", show(&created.id)));
            if ctx.json_output {
                print_json(&created)?;
            }
            Ok(())
        }
        AccountsCommand::Resolve { name, account_type } => {
            let account = with_client(ctx, |client| async move {
                client.accounts().resolve(&name, account_type).await
            })
            .await?;
            print_account(ctx, &account)
        }
    }
}

fn row(account: &Account) -> String {
    let dim = Style::new().dim();
    format!(
        "{} {}  {}  {}",
        dim.apply_to(format!("[{}]", show(&account.id))),
        show(&account.fully_qualified_name.clone().or(account.name.clone())),
        dim.apply_to(show(&account.account_type)),
        dim.apply_to(money(account.current_balance))
    )
}

fn print_account(ctx: &Context, account: &Account) -> Result<()> {
    print_record(
        ctx,
        account,
        &[
            ("ID", show(&account.id)),
            ("Name", show(&account.name)),
            ("Type", show(&account.account_type)),
            (
                "Class",
                show(&account.classification.as_ref().map(|c| format!("{:?}", c))),
            ),
            ("Balance", money(account.current_balance)),
            ("Active", show(&account.active)),
        ],
    )
}
