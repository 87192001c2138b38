//! Payments API.

use crate::client::QuickBooksClient;
use crate::error::Result;
use crate::query::quote;
use crate::types::{DeletedEntity, ListParams, Page, Payment};

/// Payments API client.
pub struct PaymentsApi {
    client: QuickBooksClient,
}

impl PaymentsApi {
    pub(crate) fn new(client: QuickBooksClient) -> Self {
        Self { client }
    }

    /// List payments, newest first.
    pub async fn list(&self, params: ListParams) -> Result<Page<Payment>> {
        self.client.list(&params, Vec::new()).await
    }

    /// List payments received from one customer.
    pub async fn list_for_customer(
        &self,
        customer_id: &str,
        params: ListParams,
    ) -> Result<Page<Payment>> {
        let condition = format!("CustomerRef = {}", quote(customer_id));
        self.client.list(&params, vec![condition]).await
    }

    pub async fn get(&self, id: &str) -> Result<Payment> {
        self.client.get(id).await
    }

    /// Record a payment, optionally applied to invoices via its lines.
    pub async fn create(&self, payment: &Payment) -> Result<Payment> {
        self.client.create(payment).await
    }

    pub async fn delete(&self, id: &str) -> Result<DeletedEntity> {
        self.client.delete::<Payment>(id).await
    }
}
