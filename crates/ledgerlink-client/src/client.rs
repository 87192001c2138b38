//! Main client implementation.

use std::sync::Arc;

use ledgerlink_config::Environment;
use ledgerlink_oauth::{ApiRequest, TokenSession};
use serde_json::{Map, Value, json};
use url::Url;

use crate::api::{AccountsApi, CompanyApi, CustomersApi, InvoicesApi, ItemsApi, PaymentsApi};
use crate::error::{Error, Result};
use crate::query::Query;
use crate::types::{DeletedEntity, Entity, ListParams, Page};

/// QuickBooks Online accounting client.
///
/// Stateless apart from its configuration: every call goes through the
/// shared [`TokenSession`], which owns the credentials and the
/// refresh/retry protocol.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use ledgerlink_client::{ListParams, QuickBooksClient};
/// use ledgerlink_oauth::{OAuthConfig, TokenSession};
///
/// # async fn example() -> ledgerlink_client::Result<()> {
/// let session = Arc::new(TokenSession::new(OAuthConfig::new(
///     "client-id",
///     "client-secret",
///     "https://example.com/callback",
/// )));
/// let client = QuickBooksClient::builder().session(session).build()?;
///
/// let page = client.customers().list(ListParams::default().search("Acme")).await?;
/// println!("{} of {} customers", page.items.len(), page.total_count);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct QuickBooksClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    session: Arc<TokenSession>,
    /// Always ends with `/`.
    base_url: Url,
    minor_version: Option<u32>,
}

impl QuickBooksClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The session all calls go through.
    pub fn session(&self) -> &Arc<TokenSession> {
        &self.inner.session
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn customers(&self) -> CustomersApi {
        CustomersApi::new(self.clone())
    }

    pub fn items(&self) -> ItemsApi {
        ItemsApi::new(self.clone())
    }

    pub fn accounts(&self) -> AccountsApi {
        AccountsApi::new(self.clone())
    }

    pub fn invoices(&self) -> InvoicesApi {
        InvoicesApi::new(self.clone())
    }

    pub fn payments(&self) -> PaymentsApi {
        PaymentsApi::new(self.clone())
    }

    pub fn company(&self) -> CompanyApi {
        CompanyApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Generic entity operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Run the page query then the count query.
    ///
    /// `conditions` are added to whatever `params` implies. A failed count
    /// query does not fail the listing; the total falls back to the number
    /// of rows returned.
    pub(crate) async fn list<E: Entity>(
        &self,
        params: &ListParams,
        conditions: Vec<String>,
    ) -> Result<Page<E>> {
        params.validate()?;

        let mut query = Query::for_entity::<E>();
        for condition in conditions {
            query = query.where_raw(condition);
        }
        if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
            query = query.where_like(E::SEARCH_FIELD, search);
        }
        if params.include_inactive && E::HAS_ACTIVE {
            query = query.include_inactive();
        }

        let start_position = params.start_position();
        let items: Vec<E> = self
            .query_rows(
                &query
                    .clone()
                    .order_by(E::ORDER_BY)
                    .paginate(start_position, params.page_size)
                    .to_sql(),
            )
            .await?;

        let total_count = match self.query_count(&query.to_count_sql()).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    entity = E::NAME,
                    error = %e,
                    "Count query failed, using page size as total"
                );
                items.len() as u64
            }
        };

        Ok(Page {
            items,
            page: params.page,
            page_size: params.page_size,
            start_position,
            total_count,
        })
    }

    /// Fetch one entity by id through the query endpoint.
    pub(crate) async fn get<E: Entity>(&self, id: &str) -> Result<E> {
        let mut query = Query::for_entity::<E>().where_eq("Id", id);
        if E::HAS_ACTIVE {
            query = query.include_inactive();
        }
        self.query_rows::<E>(&query.to_sql())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                entity: E::NAME,
                id: id.to_string(),
            })
    }

    /// First row whose `field` equals `value` exactly.
    pub(crate) async fn find_by<E: Entity>(
        &self,
        field: &str,
        value: &str,
        include_inactive: bool,
    ) -> Result<Option<E>> {
        let mut query = Query::for_entity::<E>().where_eq(field, value);
        if include_inactive && E::HAS_ACTIVE {
            query = query.include_inactive();
        }
        Ok(self
            .query_rows::<E>(&query.paginate(1, 1).to_sql())
            .await?
            .into_iter()
            .next())
    }

    pub(crate) async fn create<E: Entity>(&self, entity: &E) -> Result<E> {
        if entity.id().is_some() {
            return Err(Error::InvalidRequest(format!(
                "{} to create must not carry an Id",
                E::NAME
            )));
        }
        let body = serde_json::to_value(entity)?;
        let response = self.post(&E::path(), &[], Some(body)).await?;
        let created: E = extract(response, E::NAME)?;
        tracing::info!(entity = E::NAME, id = ?created.id(), "Created");
        Ok(created)
    }

    /// Sparse update: only the fields set on `entity` change.
    pub(crate) async fn update<E: Entity>(&self, entity: &E) -> Result<E> {
        let mut body = match serde_json::to_value(entity)? {
            Value::Object(map) => map,
            _ => {
                return Err(Error::InvalidRequest(format!(
                    "{} did not serialize to an object",
                    E::NAME
                )));
            }
        };
        require_identity::<E>(entity.id(), entity.sync_token())?;
        body.remove("MetaData");
        self.update_fields::<E>(body).await
    }

    /// Sparse update from raw fields. `fields` must carry `Id` and `SyncToken`.
    pub(crate) async fn update_fields<E: Entity>(&self, mut fields: Map<String, Value>) -> Result<E> {
        fields.insert("sparse".to_string(), Value::Bool(true));
        let response = self
            .post(&E::path(), &[("operation", "update")], Some(Value::Object(fields)))
            .await?;
        let updated: E = extract(response, E::NAME)?;
        tracing::info!(entity = E::NAME, id = ?updated.id(), "Updated");
        Ok(updated)
    }

    /// Set `Active=false`; the API's soft delete for list entities.
    pub(crate) async fn deactivate<E: Entity>(&self, id: &str) -> Result<E> {
        let current: E = self.get(id).await?;
        let sync_token = require_identity::<E>(current.id(), current.sync_token())?;

        let mut fields = Map::new();
        fields.insert("Id".to_string(), Value::String(id.to_string()));
        fields.insert("SyncToken".to_string(), Value::String(sync_token));
        fields.insert("Active".to_string(), Value::Bool(false));
        self.update_fields::<E>(fields).await
    }

    /// Hard delete for transaction entities.
    pub(crate) async fn delete<E: Entity>(&self, id: &str) -> Result<DeletedEntity> {
        let current: E = self.get(id).await?;
        let sync_token = require_identity::<E>(current.id(), current.sync_token())?;

        let body = json!({"Id": id, "SyncToken": sync_token});
        let response = self
            .post(&E::path(), &[("operation", "delete")], Some(body))
            .await?;
        let deleted: DeletedEntity = extract(response, E::NAME)?;
        tracing::info!(entity = E::NAME, id = %deleted.id, "Deleted");
        Ok(deleted)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Rows of `entity` from a query; an empty result has no entity key.
    pub(crate) async fn query_rows<E: Entity>(&self, sql: &str) -> Result<Vec<E>> {
        let mut body = self.get_path("query", &[("query", sql)]).await?;
        match body
            .get_mut("QueryResponse")
            .and_then(|r| r.get_mut(E::NAME))
            .map(Value::take)
        {
            Some(rows) => Ok(serde_json::from_value(rows)?),
            None => Ok(Vec::new()),
        }
    }

    pub(crate) async fn query_count(&self, sql: &str) -> Result<u64> {
        let body = self.get_path("query", &[("query", sql)]).await?;
        body.get("QueryResponse")
            .and_then(|r| r.get("totalCount"))
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::UnexpectedResponse("count query returned no totalCount".into()))
    }

    /// Build a company-scoped URL. Fails with `AuthConfig` before any
    /// network call when no tenant is established.
    pub(crate) async fn company_url(&self, path: &str) -> Result<Url> {
        let realm = self.inner.session.require_tenant().await?;
        let path = path.trim_start_matches('/');
        self.inner
            .base_url
            .join(&format!("company/{}/{}", urlencoding::encode(&realm), path))
            .map_err(Error::from)
    }

    pub(crate) async fn get_path(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = self.company_url(path).await?;
        self.send(ApiRequest::get(url), query).await
    }

    pub(crate) async fn post(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value> {
        let url = self.company_url(path).await?;
        let mut request = ApiRequest::new(reqwest::Method::POST, url);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        self.send(request, query).await
    }

    async fn send(&self, mut request: ApiRequest, query: &[(&str, &str)]) -> Result<Value> {
        for (key, value) in query {
            request = request.with_query(*key, *value);
        }
        if let Some(minor) = self.inner.minor_version {
            request = request.with_query("minorversion", minor.to_string());
        }
        tracing::debug!(method = %request.method, path = request.url.path(), "Accounting API request");
        let response = self.inner.session.authenticated_call(&request).await?;
        Ok(response.body)
    }
}

/// Pull `key` out of a response envelope such as `{"Customer": {...}, "time": ...}`.
pub(crate) fn extract<T: serde::de::DeserializeOwned>(mut body: Value, key: &str) -> Result<T> {
    match body.get_mut(key).map(Value::take) {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Err(Error::UnexpectedResponse(format!(
            "response has no '{}' object",
            key
        ))),
    }
}

fn require_identity<E: Entity>(id: Option<&str>, sync_token: Option<&str>) -> Result<String> {
    if id.is_none_or(str::is_empty) {
        return Err(Error::InvalidRequest(format!("{} has no Id", E::NAME)));
    }
    sync_token
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidRequest(format!("{} has no SyncToken", E::NAME)))
}

/// Builder for creating a QuickBooksClient.
#[derive(Debug, Default)]
pub struct ClientBuilder {
    session: Option<Arc<TokenSession>>,
    environment: Environment,
    base_url: Option<String>,
    minor_version: Option<u32>,
}

impl ClientBuilder {
    /// Create a new builder with defaults (sandbox, no minor version).
    pub fn new() -> Self {
        Self::default()
    }

    /// Session every request goes through. Required.
    pub fn session(mut self, session: Arc<TokenSession>) -> Self {
        self.session = Some(session);
        self
    }

    /// Pick the environment's base URL.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Override the base URL (e.g. `http://localhost:9000/v3`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// `minorversion` sent with every call.
    pub fn minor_version(mut self, minor_version: Option<u32>) -> Self {
        self.minor_version = minor_version;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<QuickBooksClient> {
        let session = self
            .session
            .ok_or_else(|| Error::Config("session is required".to_string()))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| self.environment.api_base_url().to_string());
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Ok(QuickBooksClient {
            inner: Arc::new(ClientInner {
                session,
                base_url,
                minor_version: self.minor_version,
            }),
        })
    }
}
