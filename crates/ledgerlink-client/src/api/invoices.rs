//! Invoices API.

use crate::client::{QuickBooksClient, extract};
use crate::error::{Error, Result};
use crate::query::quote;
use crate::types::{DeletedEntity, Invoice, ListParams, Page};

/// Invoices API client.
pub struct InvoicesApi {
    client: QuickBooksClient,
}

impl InvoicesApi {
    pub(crate) fn new(client: QuickBooksClient) -> Self {
        Self { client }
    }

    /// List invoices, newest first. Search matches the document number.
    pub async fn list(&self, params: ListParams) -> Result<Page<Invoice>> {
        self.client.list(&params, Vec::new()).await
    }

    /// List invoices billed to one customer.
    pub async fn list_for_customer(
        &self,
        customer_id: &str,
        params: ListParams,
    ) -> Result<Page<Invoice>> {
        let condition = format!("CustomerRef = {}", quote(customer_id));
        self.client.list(&params, vec![condition]).await
    }

    pub async fn get(&self, id: &str) -> Result<Invoice> {
        self.client.get(id).await
    }

    pub async fn create(&self, invoice: &Invoice) -> Result<Invoice> {
        if invoice.customer_ref.is_none() {
            return Err(Error::InvalidRequest(
                "invoice needs a CustomerRef".to_string(),
            ));
        }
        if invoice.line.is_empty() {
            return Err(Error::InvalidRequest(
                "invoice needs at least one line".to_string(),
            ));
        }
        self.client.create(invoice).await
    }

    /// Sparse update. When `Line` is set it replaces all existing lines.
    pub async fn update(&self, invoice: &Invoice) -> Result<Invoice> {
        self.client.update(invoice).await
    }

    pub async fn delete(&self, id: &str) -> Result<DeletedEntity> {
        self.client.delete::<Invoice>(id).await
    }

    /// Email the invoice. Without `send_to` the invoice's `BillEmail` is used.
    pub async fn send(&self, id: &str, send_to: Option<&str>) -> Result<Invoice> {
        let path = format!("invoice/{}/send", urlencoding::encode(id));
        let query: Vec<(&str, &str)> = send_to.map(|to| ("sendTo", to)).into_iter().collect();
        let body = self.client.post(&path, &query, None).await?;
        let invoice: Invoice = extract(body, "Invoice")?;
        tracing::info!(id = %id, email_status = ?invoice.email_status, "Invoice sent");
        Ok(invoice)
    }
}
