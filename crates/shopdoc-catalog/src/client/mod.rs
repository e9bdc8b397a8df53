//! HTTP client for the Admin GraphQL API.

mod endpoint;

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::CatalogError;
use crate::pagination::ProductSource;
use crate::query;
use crate::rate_limit::retry_with_backoff;
use crate::types::{describe_errors, GraphqlResponse, PageResult, ProductsData};

pub use endpoint::{admin_endpoint, shop_host};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const USER_AGENT: &str = "shopdoc/0.1 (catalog-export)";

/// Client for the Admin GraphQL API of one shop.
///
/// Every request is a `POST` to the shop's `graphql.json` endpoint carrying
/// the access token. HTTP 429, GraphQL `THROTTLED` errors and 5xx responses
/// are retried with exponential back-off; everything else surfaces as a
/// typed [`CatalogError`].
pub struct CatalogClient {
    client: Client,
    endpoint: Url,
    access_token: String,
    product_filter: Option<String>,
    metafield_keys: Vec<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl CatalogClient {
    /// Creates a client for `shop_domain` on the given Admin API version.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidEndpoint`] if the domain cannot be turned
    /// into a URL, or [`CatalogError::Http`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(
        shop_domain: &str,
        api_version: &str,
        access_token: &str,
        timeout_secs: u64,
    ) -> Result<Self, CatalogError> {
        let endpoint = admin_endpoint(shop_domain, api_version)?;
        Self::build(endpoint, access_token, timeout_secs)
    }

    /// Creates a client pointed at an explicit GraphQL endpoint (for testing
    /// with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidEndpoint`] if `endpoint` is not a valid
    /// URL, or [`CatalogError::Http`] if the client cannot be constructed.
    pub fn with_endpoint(
        endpoint: &str,
        access_token: &str,
        timeout_secs: u64,
    ) -> Result<Self, CatalogError> {
        let url = Url::parse(endpoint).map_err(|e| CatalogError::InvalidEndpoint {
            domain: endpoint.to_owned(),
            reason: e.to_string(),
        })?;
        Self::build(url, access_token, timeout_secs)
    }

    fn build(endpoint: Url, access_token: &str, timeout_secs: u64) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            access_token: access_token.to_owned(),
            product_filter: None,
            metafield_keys: Vec::new(),
            max_retries: 3,
            backoff_base_ms: 1_000,
        })
    }

    /// Sets the retry policy. `max_retries = 0` disables retries.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Sets the search predicate forwarded with every product query. It is
    /// passed through untouched.
    #[must_use]
    pub fn with_product_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.product_filter = Some(filter).filter(|f| !f.trim().is_empty());
        self
    }

    /// Sets the metafield allow-list requested for every product.
    #[must_use]
    pub fn with_metafield_keys(mut self, keys: Vec<String>) -> Self {
        self.metafield_keys = keys;
        self
    }

    pub(crate) fn product_filter(&self) -> Option<&str> {
        self.product_filter.as_deref()
    }

    pub(crate) fn metafield_keys(&self) -> &[String] {
        &self.metafield_keys
    }

    /// Fetches one page of products after `cursor` (`None` for the first page).
    ///
    /// # Errors
    ///
    /// - [`CatalogError::SourceUnavailable`]: the response carried errors
    ///   instead of a `products` connection.
    /// - [`CatalogError::RateLimited`] / [`CatalogError::Throttled`]: still
    ///   throttled after all retries.
    /// - [`CatalogError::UnexpectedStatus`] / [`CatalogError::Http`]: transport failure.
    /// - [`CatalogError::Deserialize`]: the body is not the expected JSON shape.
    pub async fn fetch_products_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<PageResult, CatalogError> {
        let body = json!({
            "query": query::products_query(!self.metafield_keys.is_empty()),
            "variables": query::products_variables(
                page_size,
                cursor,
                self.product_filter.as_deref(),
                &self.metafield_keys,
            ),
        });

        let envelope: GraphqlResponse<ProductsData> = self.graphql("products page", &body).await?;
        let connection = envelope
            .data
            .and_then(|d| d.products)
            .ok_or_else(|| CatalogError::SourceUnavailable(describe_errors(&envelope.errors)))?;

        Ok(PageResult::from(connection))
    }

    /// Sends one GraphQL request with retry and returns the decoded envelope.
    ///
    /// A response with errors but no data whose errors are all `THROTTLED`
    /// becomes [`CatalogError::Throttled`] so the retry loop picks it up.
    pub(crate) async fn graphql<T>(
        &self,
        context: &str,
        body: &Value,
    ) -> Result<GraphqlResponse<T>, CatalogError>
    where
        T: DeserializeOwned,
    {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let response = self
                .client
                .post(self.endpoint.clone())
                .header(ACCESS_TOKEN_HEADER, &self.access_token)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(body)
                .send()
                .await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(2);
                return Err(CatalogError::RateLimited { retry_after_secs });
            }

            if !status.is_success() {
                return Err(CatalogError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: self.endpoint.to_string(),
                });
            }

            let text = response.text().await?;
            let envelope: GraphqlResponse<T> =
                serde_json::from_str(&text).map_err(|e| CatalogError::Deserialize {
                    context: context.to_owned(),
                    source: e,
                })?;

            let throttled = envelope.data.is_none()
                && !envelope.errors.is_empty()
                && envelope.errors.iter().all(|e| e.code() == Some("THROTTLED"));
            if throttled {
                return Err(CatalogError::Throttled(describe_errors(&envelope.errors)));
            }

            Ok(envelope)
        })
        .await
    }

    /// Downloads a signed result file. The access token is NOT sent: the URL
    /// points at object storage, not the shop.
    pub(crate) async fn download_text(&self, url: &str) -> Result<String, CatalogError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(CatalogError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }
            Ok(response.text().await?)
        })
        .await
    }
}

impl ProductSource for CatalogClient {
    async fn fetch_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<PageResult, CatalogError> {
        self.fetch_products_page(cursor, page_size).await
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
