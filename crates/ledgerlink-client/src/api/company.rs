//! Company info API.

use crate::client::{QuickBooksClient, extract};
use crate::error::Result;
use crate::types::CompanyInfo;

/// Company info API client.
pub struct CompanyApi {
    client: QuickBooksClient,
}

impl CompanyApi {
    pub(crate) fn new(client: QuickBooksClient) -> Self {
        Self { client }
    }

    /// Profile of the connected company.
    pub async fn info(&self) -> Result<CompanyInfo> {
        let realm = self.client.session().require_tenant().await?;
        let body = self
            .client
            .get_path(&format!("companyinfo/{}", urlencoding::encode(&realm)), &[])
            .await?;
        extract(body, "CompanyInfo")
    }
}
