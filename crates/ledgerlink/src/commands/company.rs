//! Company command - connected company profile.

use anyhow::Result;

use super::{Context, print_record, show, with_client};

/// Run the company command.
pub async fn run(ctx: &Context) -> Result<()> {
    let info = with_client(ctx, |client| async move { client.company().info().await }).await?;

    let address = info.company_addr.as_ref().map(|addr| {
        [
            addr.line1.as_deref(),
            addr.city.as_deref(),
            addr.country_sub_division_code.as_deref(),
            addr.postal_code.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
    });

    print_record(
        ctx,
        &info,
        &[
            ("Realm", show(&info.id)),
            ("Name", show(&info.company_name)),
            ("Legal name", show(&info.legal_name)),
            ("Address", show(&address)),
            ("Country", show(&info.country)),
            (
                "Email",
                show(&info.email.as_ref().map(|e| e.address.clone())),
            ),
            ("Fiscal year", show(&info.fiscal_year_start_month)),
        ],
    )
}
