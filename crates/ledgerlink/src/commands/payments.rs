//! Payments command - received customer payments.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::Style;
use ledgerlink_client::{Payment, Ref};

use super::{Context, ListArgs, money, print_json, print_page, print_record, print_success, show, with_client};

/// Arguments for the payments command.
#[derive(Args, Debug)]
pub struct PaymentsArgs {
    #[command(subcommand)]
    pub command: PaymentsCommand,
}

#[derive(Subcommand, Debug)]
pub enum PaymentsCommand {
    /// List payments, newest first
    List {
        /// Only payments from this customer ID
        #[arg(long)]
        customer: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },

    /// Show a payment
    Get {
        /// Payment ID
        id: String,
    },

    /// Record a payment
    Create {
        /// Customer ID
        #[arg(long)]
        customer: String,

        /// Total amount received
        #[arg(long)]
        amount: f64,

        /// Apply the full amount to this invoice ID
        #[arg(long)]
        invoice: Option<String>,

        /// Reference number (cheque number, transfer id)
        #[arg(long)]
        reference: Option<String>,
    },

    /// Delete a payment
    Delete {
        /// Payment ID
        id: String,
    },
}

/// Run the payments command.
pub async fn run(args: PaymentsArgs, ctx: &Context) -> Result<()> {
    match args.command {
        PaymentsCommand::List { customer, list } => {
            let page = with_client(ctx, |client| async move {
                let payments = client.payments();
                match customer {
                    Some(id) => payments.list_for_customer(&id, list.into()).await,
                    None => payments.list(list.into()).await,
                }
            })
            .await?;
            print_page(ctx, "Payments", &page, row)
        }
        PaymentsCommand::Get { id } => {
            let payment =
                with_client(ctx, |client| async move { client.payments().get(&id).await })
                    .await?;
            print_payment(ctx, &payment)
        }
        PaymentsCommand::Create {
            customer,
            amount,
            invoice,
            reference,
        } => {
            if !amount.is_finite() || amount <= 0.0 {
                bail!("Payment amount must be positive");
            }
            let mut payment = Payment::new(Ref::new(customer), amount);
            if let Some(invoice_id) = invoice {
                payment = payment.apply_to_invoice(invoice_id, amount);
            }
            payment.payment_ref_num = reference;

            let created = with_client(ctx, |client| async move {
                client.payments().create(&payment).await
            })
            .await?;
            print_success(
                ctx,
                format!(
                    "Payment recorded: {} ({})",
                    show(&created.id),
                    money(created.total_amt)
                ),
            );
            if ctx.json_output {
                print_json(&created)?;
            }
            Ok(())
        }
        PaymentsCommand::Delete { id } => {
            let deleted = with_client(ctx, |client| async move {
                client.payments().delete(&id).await
            })
            .await?;
            print_success(ctx, format!("Payment deleted: {}", deleted.id));
            if ctx.json_output {
                print_json(&deleted)?;
            }
            Ok(())
        }
    }
}

fn row(payment: &Payment) -> String {
    let dim = Style::new().dim();
    format!(
        "{} {}  {}  {}",
        dim.apply_to(format!("[{}]", show(&payment.id))),
        show(&payment.customer_ref.as_ref().and_then(|c| c.name.clone())),
        dim.apply_to(show(&payment.txn_date)),
        money(payment.total_amt)
    )
}

fn print_payment(ctx: &Context, payment: &Payment) -> Result<()> {
    let applied: Vec<String> = payment
        .line
        .iter()
        .flat_map(|line| {
            line.linked_txn
                .iter()
                .map(move |txn| format!("{} {} ({})", txn.txn_type, txn.txn_id, money(Some(line.amount))))
        })
        .collect();

    print_record(
        ctx,
        payment,
        &[
            ("ID", show(&payment.id)),
            (
                "Customer",
                show(&payment.customer_ref.as_ref().map(|c| c.id.clone())),
            ),
            ("Date", show(&payment.txn_date)),
            ("Amount", money(payment.total_amt)),
            ("Unapplied", money(payment.unapplied_amt)),
            ("Reference", show(&payment.payment_ref_num)),
            (
                "Applied to",
                if applied.is_empty() {
                    "-".to_string()
                } else {
                    applied.join(", ")
                },
            ),
        ],
    )
}
