//! Customers API.

use crate::client::QuickBooksClient;
use crate::error::Result;
use crate::types::{Customer, ListParams, Page};

/// Customers API client.
pub struct CustomersApi {
    client: QuickBooksClient,
}

impl CustomersApi {
    pub(crate) fn new(client: QuickBooksClient) -> Self {
        Self { client }
    }

    /// List customers, searching on display name.
    pub async fn list(&self, params: ListParams) -> Result<Page<Customer>> {
        self.client.list(&params, Vec::new()).await
    }

    /// Get a customer by ID, including inactive ones.
    pub async fn get(&self, id: &str) -> Result<Customer> {
        self.client.get(id).await
    }

    /// Find an active customer by exact display name.
    pub async fn find_by_name(&self, display_name: &str) -> Result<Option<Customer>> {
        self.client
            .find_by("DisplayName", display_name, false)
            .await
    }

    pub async fn create(&self, customer: &Customer) -> Result<Customer> {
        self.client.create(customer).await
    }

    /// Sparse update. `customer` must carry `Id` and `SyncToken`.
    pub async fn update(&self, customer: &Customer) -> Result<Customer> {
        self.client.update(customer).await
    }

    /// Mark a customer inactive. Customers cannot be deleted.
    pub async fn deactivate(&self, id: &str) -> Result<Customer> {
        self.client.deactivate::<Customer>(id).await
    }
}
