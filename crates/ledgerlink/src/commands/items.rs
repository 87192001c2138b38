//! Items command - products and services.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;
use ledgerlink_client::{Item, ItemType, Ref};

use super::{Context, ListArgs, money, print_json, print_page, print_record, print_success, show, with_client};

/// Arguments for the items command.
#[derive(Args, Debug)]
pub struct ItemsArgs {
    #[command(subcommand)]
    pub command: ItemsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ItemsCommand {
    /// List items
    List(ListArgs),

    /// Show an item
    Get {
        /// Item ID
        id: String,
    },

    /// Create an item
    Create {
        /// Item name (must be unique)
        name: String,

        /// Unit sales price
        #[arg(long)]
        price: Option<f64>,

        /// Item type: service, non-inventory, inventory
        #[arg(long = "type", default_value = "service")]
        item_type: ItemType,

        /// Income account, by name
        #[arg(long)]
        income_account: Option<String>,

        /// Sales description
        #[arg(long)]
        description: Option<String>,
    },

    /// Update the price or description of an item
    Update {
        /// Item ID
        id: String,

        /// New unit sales price
        #[arg(long)]
        price: Option<f64>,

        /// New sales description
        #[arg(long)]
        description: Option<String>,
    },

    /// Mark an item inactive
    Deactivate {
        /// Item ID
        id: String,
    },
}

/// Run the items command.
pub async fn run(args: ItemsArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ItemsCommand::List(list) => {
            let page = with_client(ctx, |client| async move {
                client.items().list(list.into()).await
            })
            .await?;
            print_page(ctx, "Items", &page, row)
        }
        ItemsCommand::Get { id } => {
            let item =
                with_client(ctx, |client| async move { client.items().get(&id).await })
                    .await?;
            print_item(ctx, &item)
        }
        ItemsCommand::Create {
            name,
            price,
            item_type,
            income_account,
            description,
        } => {
            let item = Item {
                name: Some(name),
                item_type: Some(item_type),
                unit_price: price,
                description,
                income_account_ref: income_account.map(Ref::by_name),
                ..Default::default()
            };
            let created = with_client(ctx, |client| async move {
                client.items().create(&item).await
            })
            .await?;
            print_success(ctx, format!("Item created: {}", show(&created.id)));
            if ctx.json_output {
                print_json(&created)?;
            }
            Ok(())
        }
        ItemsCommand::Update {
            id,
            price,
            description,
        } => {
            let updated = with_client(ctx, |client| async move {
                let current = client.items().get(&id).await?;
                let update = Item {
                    id: current.id,
                    sync_token: current.sync_token,
                    unit_price: price,
                    description,
                    ..Default::default()
                };
                client.items().update(&update).await
            })
            .await?;
            print_success(ctx, format!("Item updated: {}", show(&updated.id)));
            if ctx.json_output {
                print_json(&updated)?;
            }
            Ok(())
        }
        ItemsCommand::Deactivate { id } => {
            let item = with_client(ctx, |client| async move {
                client.items().deactivate(&id).await
            })
            .await?;
            print_success(ctx, format!("Item deactivated: {}", show(&item.id)));
            if ctx.json_output {
                print_json(&item)?;
            }
            Ok(())
        }
    }
}

fn row(item: &Item) -> String {
    let dim = Style::new().dim();
    let inactive = if item.active == Some(false) {
        " (inactive)"
    } else {
        ""
    };
    format!(
        "{} {}{}  {}",
        dim.apply_to(format!("[{}]", show(&item.id))),
        show(&item.name),
        inactive,
        dim.apply_to(money(item.unit_price))
    )
}

fn print_item(ctx: &Context, item: &Item) -> Result<()> {
    print_record(
        ctx,
        item,
        &[
            ("ID", show(&item.id)),
            ("Name", show(&item.name)),
            ("Type", show(&item.item_type.as_ref().map(|t| format!("{:?}", t)))),
            ("Price", money(item.unit_price)),
            ("Description", show(&item.description)),
            (
                "Income acct",
                show(&item.income_account_ref.as_ref().and_then(|r| r.name.clone())),
            ),
            ("Active", show(&item.active)),
        ],
    )
}
