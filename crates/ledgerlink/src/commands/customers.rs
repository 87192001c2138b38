//! Customers command - customer records.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::Style;
use ledgerlink_client::{Customer, EmailAddress, PhoneNumber};

use super::{
    Context, ListArgs, money, print_json, print_page, print_record, print_success, show,
    with_client,
};

/// Arguments for the customers command.
#[derive(Args, Debug)]
pub struct CustomersArgs {
    #[command(subcommand)]
    pub command: CustomersCommand,
}

/// Editable customer fields.
#[derive(Args, Debug, Clone, Default)]
pub struct CustomerFields {
    /// Company name
    #[arg(long)]
    pub company: Option<String>,

    /// Primary email address
    #[arg(long)]
    pub email: Option<String>,

    /// Primary phone number
    #[arg(long)]
    pub phone: Option<String>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CustomersCommand {
    /// List customers
    List(ListArgs),

    /// Show a customer
    Get {
        /// Customer ID
        id: String,
    },

    /// Find a customer by exact display name
    Find {
        /// Display name
        name: String,
    },

    /// Create a customer
    Create {
        /// Display name (must be unique)
        name: String,

        #[command(flatten)]
        fields: CustomerFields,
    },

    /// Update fields of a customer
    Update {
        /// Customer ID
        id: String,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: CustomerFields,
    },

    /// Mark a customer inactive
    Deactivate {
        /// Customer ID
        id: String,
    },
}

/// Run the customers command.
pub async fn run(args: CustomersArgs, ctx: &Context) -> Result<()> {
    match args.command {
        CustomersCommand::List(list) => {
            let page = with_client(ctx, |client| async move {
                client.customers().list(list.into()).await
            })
            .await?;
            print_page(ctx, "Customers", &page, row)
        }
        CustomersCommand::Get { id } => {
            let customer = with_client(ctx, |client| async move {
                client.customers().get(&id).await
            })
            .await?;
            print_customer(ctx, &customer)
        }
        CustomersCommand::Find { name } => {
            let found = with_client(ctx, |client| async move {
                client.customers().find_by_name(&name).await
            })
            .await?;
            match found {
                Some(customer) => print_customer(ctx, &customer),
                None if ctx.json_output => print_json(&serde_json::Value::Null),
                None => bail!("No active customer with that display name"),
            }
        }
        CustomersCommand::Create { name, fields } => {
            let mut customer = Customer::new(name);
            apply_fields(&mut customer, fields);
            let created = with_client(ctx, |client| async move {
                client.customers().create(&customer).await
            })
            .await?;
            print_success(ctx, format!("Customer created: {}", show(&created.id)));
            if ctx.json_output {
                print_json(&created)?;
            }
            Ok(())
        }
        CustomersCommand::Update { id, name, fields } => {
            let updated = with_client(ctx, |client| async move {
                let current = client.customers().get(&id).await?;
                let mut update = Customer {
                    id: current.id,
                    sync_token: current.sync_token,
                    display_name: name,
                    ..Default::default()
                };
                apply_fields(&mut update, fields);
                client.customers().update(&update).await
            })
            .await?;
            print_success(ctx, format!("Customer updated: {}", show(&updated.id)));
            if ctx.json_output {
                print_json(&updated)?;
            }
            Ok(())
        }
        CustomersCommand::Deactivate { id } => {
            let customer = with_client(ctx, |client| async move {
                client.customers().deactivate(&id).await
            })
            .await?;
            print_success(ctx, format!("Customer deactivated: {}", show(&customer.id)));
            if ctx.json_output {
                print_json(&customer)?;
            }
            Ok(())
        }
    }
}

fn apply_fields(customer: &mut Customer, fields: CustomerFields) {
    if fields.company.is_some() {
        customer.company_name = fields.company;
    }
    if let Some(address) = fields.email {
        customer.primary_email_addr = Some(EmailAddress { address });
    }
    if let Some(free_form_number) = fields.phone {
        customer.primary_phone = Some(PhoneNumber { free_form_number });
    }
    if fields.notes.is_some() {
        customer.notes = fields.notes;
    }
}

fn row(customer: &Customer) -> String {
    let dim = Style::new().dim();
    let inactive = if customer.active == Some(false) {
        " (inactive)"
    } else {
        ""
    };
    format!(
        "{} {}{}  {}",
        dim.apply_to(format!("[{}]", show(&customer.id))),
        show(&customer.display_name),
        inactive,
        dim.apply_to(money(customer.balance))
    )
}

fn print_customer(ctx: &Context, customer: &Customer) -> Result<()> {
    print_record(
        ctx,
        customer,
        &[
            ("ID", show(&customer.id)),
            ("Name", show(&customer.display_name)),
            ("Company", show(&customer.company_name)),
            (
                "Email",
                show(&customer.primary_email_addr.as_ref().map(|e| e.address.clone())),
            ),
            (
                "Phone",
                show(&customer.primary_phone.as_ref().map(|p| p.free_form_number.clone())),
            ),
            ("Balance", money(customer.balance)),
            ("Active", show(&customer.active)),
        ],
    )
}
