//! Accounts API.

use ledgerlink_oauth::UpstreamFault;

use crate::client::QuickBooksClient;
use crate::error::{Error, Result};
use crate::types::{Account, AccountType, ListParams, Page};

/// Vendor fault code for "the name supplied already exists".
pub const DUPLICATE_NAME_FAULT_CODE: &str = "6240";

/// Accounts API client.
pub struct AccountsApi {
    client: QuickBooksClient,
}

impl AccountsApi {
    pub(crate) fn new(client: QuickBooksClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: ListParams) -> Result<Page<Account>> {
        self.client.list(&params, Vec::new()).await
    }

    pub async fn get(&self, id: &str) -> Result<Account> {
        self.client.get(id).await
    }

    /// Find an active account by exact name.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Account>> {
        self.client.find_by("Name", name, false).await
    }

    pub async fn create(&self, account: &Account) -> Result<Account> {
        self.client.create(account).await
    }

    /// Sparse update. `account` must carry `Id` and `SyncToken`.
    pub async fn update(&self, account: &Account) -> Result<Account> {
        self.client.update(account).await
    }

    /// Return the account called `name`, creating it with `account_type`
    /// when none exists.
    ///
    /// A concurrent creator (or an inactive account holding the name) makes
    /// the create fail with a duplicate-name fault; the existing account is
    /// then fetched instead.
    pub async fn resolve(&self, name: &str, account_type: AccountType) -> Result<Account> {
        if let Some(existing) = self.find_by_name(name).await? {
            return Ok(existing);
        }

        match self.create(&Account::new(name, account_type)).await {
            Ok(created) => Ok(created),
            Err(e) if e.has_fault_code(DUPLICATE_NAME_FAULT_CODE) => {
                let duplicate_id = e.fault().and_then(duplicate_id);
                tracing::info!(
                    account = %name,
                    duplicate_id = ?duplicate_id,
                    "Account already exists, fetching it"
                );
                if let Some(id) = duplicate_id {
                    return self.get(&id).await;
                }
                self.client
                    .find_by("Name", name, true)
                    .await?
                    .ok_or_else(|| Error::NotFound {
                        entity: "Account",
                        id: name.to_string(),
                    })
            }
            Err(e) => Err(e),
        }
    }
}

/// Id of the existing entity named in a duplicate-name fault
/// (`"The name supplied already exists. : Id=42"`).
fn duplicate_id(fault: &UpstreamFault) -> Option<String> {
    let texts = fault
        .detail
        .iter()
        .chain(std::iter::once(&fault.message))
        .chain(fault.errors.iter().filter_map(|e| e.detail.as_ref()));

    texts.into_iter().find_map(|text| {
        let (_, rest) = text.split_once("Id=")?;
        let id: String = rest.chars().take_while(char::is_ascii_digit).collect();
        (!id.is_empty()).then_some(id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duplicate_id_from_detail() {
        let fault = UpstreamFault::from_value(
            400,
            json!({"Fault": {"Error": [{
                "Message": "Duplicate Name Exists Error",
                "Detail": "The name supplied already exists. : Id=42",
                "code": "6240"
            }], "type": "ValidationFault"}}),
        );
        assert_eq!(duplicate_id(&fault).as_deref(), Some("42"));
    }

    #[test]
    fn test_duplicate_id_absent() {
        let fault = UpstreamFault::from_value(
            400,
            json!({"Fault": {"Error": [{"Message": "Duplicate Name Exists Error", "code": "6240"}]}}),
        );
        assert_eq!(duplicate_id(&fault), None);
    }
}
