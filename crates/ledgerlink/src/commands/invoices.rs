//! Invoices command.

use anyhow::{Context as _, Result, anyhow};
use clap::{Args, Subcommand};
use console::Style;
use ledgerlink_client::{EmailAddress, Invoice, InvoiceLine, LineDetail, Ref};

use super::{Context, ListArgs, money, print_json, print_page, print_record, print_success, show, with_client};

/// Arguments for the invoices command.
#[derive(Args, Debug)]
pub struct InvoicesArgs {
    #[command(subcommand)]
    pub command: InvoicesCommand,
}

#[derive(Subcommand, Debug)]
pub enum InvoicesCommand {
    /// List invoices, newest first
    List {
        /// Only invoices billed to this customer ID
        #[arg(long)]
        customer: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },

    /// Show an invoice
    Get {
        /// Invoice ID
        id: String,
    },

    /// Create an invoice
    Create {
        /// Customer ID
        #[arg(long)]
        customer: String,

        /// Sales line as ITEM_ID:QTY:UNIT_PRICE (repeatable)
        #[arg(long = "line", required = true, value_parser = parse_line)]
        lines: Vec<InvoiceLine>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due_date: Option<String>,

        /// Billing email address
        #[arg(long)]
        email: Option<String>,

        /// Internal memo
        #[arg(long)]
        memo: Option<String>,
    },

    /// Email an invoice to the customer
    Send {
        /// Invoice ID
        id: String,

        /// Recipient; defaults to the invoice's billing email
        #[arg(long)]
        to: Option<String>,
    },

    /// Delete an invoice
    Delete {
        /// Invoice ID
        id: String,
    },
}

/// Run the invoices command.
pub async fn run(args: InvoicesArgs, ctx: &Context) -> Result<()> {
    match args.command {
        InvoicesCommand::List { customer, list } => {
            let page = with_client(ctx, |client| async move {
                let invoices = client.invoices();
                match customer {
                    Some(id) => invoices.list_for_customer(&id, list.into()).await,
                    None => invoices.list(list.into()).await,
                }
            })
            .await?;
            print_page(ctx, "Invoices", &page, row)
        }
        InvoicesCommand::Get { id } => {
            let invoice =
                with_client(ctx, |client| async move { client.invoices().get(&id).await })
                    .await?;
            print_invoice(ctx, &invoice)
        }
        InvoicesCommand::Create {
            customer,
            lines,
            due_date,
            email,
            memo,
        } => {
            let mut invoice = Invoice::new(Ref::new(customer));
            invoice.line = lines;
            invoice.due_date = due_date;
            invoice.bill_email = email.map(|address| EmailAddress { address });
            invoice.private_note = memo;

            let created = with_client(ctx, |client| async move {
                client.invoices().create(&invoice).await
            })
            .await?;
            print_success(
                ctx,
                format!(
                    "Invoice created: {} (total {})",
                    show(&created.id),
                    money(created.total_amt)
                ),
            );
            if ctx.json_output {
                print_json(&created)?;
            }
            Ok(())
        }
        InvoicesCommand::Send { id, to } => {
            let invoice = with_client(ctx, |client| async move {
                client.invoices().send(&id, to.as_deref()).await
            })
            .await?;
            print_success(
                ctx,
                format!(
                    "Invoice {} sent to {}",
                    show(&invoice.id),
                    show(&invoice.bill_email.as_ref().map(|e| e.address.clone()))
                ),
            );
            if ctx.json_output {
                print_json(&invoice)?;
            }
            Ok(())
        }
        InvoicesCommand::Delete { id } => {
            let deleted = with_client(ctx, |client| async move {
                client.invoices().delete(&id).await
            })
            .await?;
            print_success(ctx, format!("Invoice deleted: {}", deleted.id));
            if ctx.json_output {
                print_json(&deleted)?;
            }
            Ok(())
        }
    }
}

/// Parse `ITEM_ID:QTY:UNIT_PRICE`.
fn parse_line(s: &str) -> Result<InvoiceLine> {
    let mut parts = s.splitn(3, ':');
    let (Some(item), Some(qty), Some(price)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(anyhow!("expected ITEM_ID:QTY:UNIT_PRICE, got '{}'", s));
    };
    if item.trim().is_empty() {
        return Err(anyhow!("missing item id in '{}'", s));
    }
    let qty: f64 = qty
        .trim()
        .parse()
        .with_context(|| format!("invalid quantity '{}'", qty))?;
    let price: f64 = price
        .trim()
        .parse()
        .with_context(|| format!("invalid unit price '{}'", price))?;
    Ok(InvoiceLine::sales(Ref::new(item.trim()), qty, price))
}

fn row(invoice: &Invoice) -> String {
    let dim = Style::new().dim();
    format!(
        "{} #{} {}  {}  {} {}",
        dim.apply_to(format!("[{}]", show(&invoice.id))),
        show(&invoice.doc_number),
        show(&invoice.customer_ref.as_ref().and_then(|c| c.name.clone())),
        dim.apply_to(show(&invoice.txn_date)),
        money(invoice.total_amt),
        dim.apply_to(format!("(open {})", money(invoice.balance)))
    )
}

fn print_invoice(ctx: &Context, invoice: &Invoice) -> Result<()> {
    if ctx.json_output {
        return print_json(invoice);
    }

    print_record(
        ctx,
        invoice,
        &[
            ("ID", show(&invoice.id)),
            ("Number", show(&invoice.doc_number)),
            (
                "Customer",
                show(&invoice.customer_ref.as_ref().map(|c| {
                    c.name
                        .as_ref()
                        .map(|n| format!("{} ({})", n, c.id))
                        .unwrap_or_else(|| c.id.clone())
                })),
            ),
            ("Date", show(&invoice.txn_date)),
            ("Due", show(&invoice.due_date)),
            ("Total", money(invoice.total_amt)),
            ("Balance", money(invoice.balance)),
            ("Email status", show(&invoice.email_status)),
        ],
    )?;

    let dim = Style::new().dim();
    println!();
    for line in &invoice.line {
        if let LineDetail::SalesItemLineDetail { detail } = &line.detail {
            println!(
                "  {} x {} @ {}  {}",
                detail.qty.map(|q| q.to_string()).unwrap_or_else(|| "-".into()),
                show(&detail.item_ref.as_ref().map(|r| r.name.clone().unwrap_or(r.id.clone()))),
                money(detail.unit_price),
                money(Some(line.amount))
            );
        } else {
            println!("  {}", dim.apply_to(format!("{}  {}", show(&line.description), money(Some(line.amount)))));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let line = parse_line("7:3:19.99").unwrap();
        assert_eq!(line.amount, 59.97);
        match line.detail {
            LineDetail::SalesItemLineDetail { detail } => {
                assert_eq!(detail.item_ref.unwrap().id, "7");
                assert_eq!(detail.qty, Some(3.0));
                assert_eq!(detail.unit_price, Some(19.99));
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_parse_line_rejects_malformed() {
        assert!(parse_line("7:3").is_err());
        assert!(parse_line(":1:2").is_err());
        assert!(parse_line("7:x:2").is_err());
        assert!(parse_line("7:1:free").is_err());
    }
}
