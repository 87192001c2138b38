//! Items API.

use crate::client::QuickBooksClient;
use crate::error::{Error, Result};
use crate::types::{Item, ListParams, Page, Ref};

/// Items API client.
pub struct ItemsApi {
    client: QuickBooksClient,
}

impl ItemsApi {
    pub(crate) fn new(client: QuickBooksClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: ListParams) -> Result<Page<Item>> {
        self.client.list(&params, Vec::new()).await
    }

    pub async fn get(&self, id: &str) -> Result<Item> {
        self.client.get(id).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Item>> {
        self.client.find_by("Name", name, false).await
    }

    /// Create an item.
    ///
    /// An income account given only by name (see [`Ref::by_name`]) is looked
    /// up first; a name that matches no account is `NotFound`.
    pub async fn create(&self, item: &Item) -> Result<Item> {
        let mut item = item.clone();
        if let Some(account) = item.income_account_ref.take() {
            item.income_account_ref = Some(self.resolve_account(account).await?);
        }
        self.client.create(&item).await
    }

    /// Sparse update. `item` must carry `Id` and `SyncToken`.
    pub async fn update(&self, item: &Item) -> Result<Item> {
        self.client.update(item).await
    }

    /// Mark an item inactive.
    pub async fn deactivate(&self, id: &str) -> Result<Item> {
        self.client.deactivate::<Item>(id).await
    }

    async fn resolve_account(&self, account: Ref) -> Result<Ref> {
        if account.is_resolved() {
            return Ok(account);
        }
        let Some(name) = account.name.filter(|n| !n.is_empty()) else {
            return Err(Error::InvalidRequest(
                "income account needs an id or a name".to_string(),
            ));
        };

        let found = self.client.accounts().find_by_name(&name).await?;
        match found.and_then(|a| a.id) {
            Some(id) => {
                tracing::debug!(account = %name, id = %id, "Resolved income account");
                Ok(Ref::named(id, name))
            }
            None => Err(Error::NotFound {
                entity: "Account",
                id: name,
            }),
        }
    }
}
