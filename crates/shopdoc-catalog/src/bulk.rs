//! Asynchronous bulk export: submit one server-side job, poll it with a
//! bounded back-off, then download and parse its JSONL result.
//!
//! Bulk results flatten nested connections. Each metafield arrives as its own
//! line carrying `__parentId`, always after the product line it belongs to:
//!
//! ```text
//! {"id":"gid://shopify/Product/1","title":"Mug",...}
//! {"namespace":"custom","key":"material","value":"Stoneware","__parentId":"gid://shopify/Product/1"}
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::CatalogClient;
use crate::error::CatalogError;
use crate::query;
use crate::types::{describe_errors, string_or_number, GraphqlResponse, Metafield, ProductNode, RawProduct};

const PARENT_ID_FIELD: &str = "__parentId";

/// How long to wait between status checks and when to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            max_attempts: 60,
        }
    }
}

impl PollPolicy {
    #[must_use]
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Delay after status check `attempt` (zero-based): doubles each time,
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkStatus {
    Created,
    Running,
    Completed,
    Canceling,
    Canceled,
    Failed,
    Expired,
    #[serde(other)]
    Unknown,
}

impl BulkStatus {
    /// `true` once the job can no longer produce a result.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            BulkStatus::Canceling | BulkStatus::Canceled | BulkStatus::Failed | BulkStatus::Expired
        )
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkStatus::Created => "CREATED",
            BulkStatus::Running => "RUNNING",
            BulkStatus::Completed => "COMPLETED",
            BulkStatus::Canceling => "CANCELING",
            BulkStatus::Canceled => "CANCELED",
            BulkStatus::Failed => "FAILED",
            BulkStatus::Expired => "EXPIRED",
            BulkStatus::Unknown => "UNKNOWN",
        }
    }
}

/// Server-side bulk job as reported by the status query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperation {
    pub id: String,
    pub status: BulkStatus,
    #[serde(default)]
    pub error_code: Option<String>,
    /// Unsigned 64-bit count, serialized as a string.
    #[serde(default, deserialize_with = "string_or_number")]
    pub object_count: Option<String>,
    /// Signed download URL; `None` when the job produced no rows.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunData {
    bulk_operation_run_query: Option<RunPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunPayload {
    bulk_operation: Option<BulkOperation>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct UserError {
    #[serde(default)]
    field: Option<Vec<String>>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct NodeData {
    node: Option<BulkOperation>,
}

impl CatalogClient {
    /// Starts a bulk export of every product matching the client's filter.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::BulkRejected`] if the mutation reports user
    /// errors (for instance another bulk job is already running), or
    /// [`CatalogError::SourceUnavailable`] if the response carried no data.
    pub async fn submit_bulk_export(&self) -> Result<BulkOperation, CatalogError> {
        let body = json!({
            "query": query::BULK_RUN_MUTATION,
            "variables": {
                "query": query::bulk_products_query(self.product_filter(), self.metafield_keys()),
            },
        });

        let envelope: GraphqlResponse<RunData> = self.graphql("bulk export mutation", &body).await?;
        let payload = envelope
            .data
            .and_then(|d| d.bulk_operation_run_query)
            .ok_or_else(|| CatalogError::SourceUnavailable(describe_errors(&envelope.errors)))?;

        if !payload.user_errors.is_empty() {
            let reasons = payload
                .user_errors
                .iter()
                .map(|e| match e.field.as_deref() {
                    Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
                    _ => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CatalogError::BulkRejected(reasons));
        }

        let operation = payload.bulk_operation.ok_or_else(|| {
            CatalogError::BulkRejected("no bulk operation returned".to_owned())
        })?;
        tracing::info!(id = %operation.id, status = operation.status.as_str(), "bulk export submitted");
        Ok(operation)
    }

    /// Fetches the current state of bulk operation `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::SourceUnavailable`] if the operation is unknown.
    pub async fn bulk_operation(&self, id: &str) -> Result<BulkOperation, CatalogError> {
        let body = json!({
            "query": query::BULK_STATUS_QUERY,
            "variables": { "id": id },
        });

        let envelope: GraphqlResponse<NodeData> = self.graphql("bulk status query", &body).await?;
        let errors = envelope.errors;
        envelope.data.and_then(|d| d.node).ok_or_else(|| {
            let detail = if errors.is_empty() {
                format!("bulk operation {id} not found")
            } else {
                describe_errors(&errors)
            };
            CatalogError::SourceUnavailable(detail)
        })
    }

    /// Polls `id` until it completes, fails, or `policy.max_attempts` status
    /// checks have been made.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::JobFailed`]: the job ended `FAILED`, `CANCELED`,
    ///   `CANCELING` or `EXPIRED`.
    /// - [`CatalogError::JobTimedOut`]: still running after the last check.
    pub async fn wait_for_bulk_operation(
        &self,
        id: &str,
        policy: PollPolicy,
    ) -> Result<BulkOperation, CatalogError> {
        for attempt in 0..policy.max_attempts {
            let operation = self.bulk_operation(id).await?;

            if operation.status == BulkStatus::Completed {
                tracing::info!(
                    id,
                    objects = operation.object_count.as_deref().unwrap_or("0"),
                    "bulk export completed"
                );
                return Ok(operation);
            }
            if operation.status.is_failure() {
                return Err(CatalogError::JobFailed {
                    id: operation.id,
                    status: operation.status.as_str().to_owned(),
                    error_code: operation.error_code,
                });
            }

            let delay = policy.delay_for(attempt);
            tracing::debug!(
                id,
                status = operation.status.as_str(),
                attempt = attempt + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "bulk export still running"
            );
            if attempt + 1 < policy.max_attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(CatalogError::JobTimedOut {
            id: id.to_owned(),
            attempts: policy.max_attempts,
        })
    }

    /// Downloads and parses the result of a completed operation. A completed
    /// job with no URL matched nothing and yields an empty list.
    ///
    /// # Errors
    ///
    /// Propagates download failures and [`CatalogError::Deserialize`] for
    /// unparsable lines.
    pub async fn download_bulk_result(
        &self,
        operation: &BulkOperation,
    ) -> Result<Vec<RawProduct>, CatalogError> {
        let Some(url) = operation.url.as_deref() else {
            tracing::info!(id = %operation.id, "bulk export produced no result file");
            return Ok(Vec::new());
        };
        let text = self.download_text(url).await?;
        parse_bulk_jsonl(&text)
    }

    /// Submits a bulk export, waits for it, and returns the products.
    ///
    /// # Errors
    ///
    /// See [`Self::submit_bulk_export`], [`Self::wait_for_bulk_operation`] and
    /// [`Self::download_bulk_result`].
    pub async fn run_bulk_export(&self, policy: PollPolicy) -> Result<Vec<RawProduct>, CatalogError> {
        let submitted = self.submit_bulk_export().await?;
        let finished = self.wait_for_bulk_operation(&submitted.id, policy).await?;
        self.download_bulk_result(&finished).await
    }
}

/// Parses a bulk JSONL result into products, attaching each `__parentId`
/// metafield line to its product. Blank lines are ignored; children whose
/// parent was never seen are logged and dropped.
///
/// # Errors
///
/// Returns [`CatalogError::Deserialize`] naming the 1-based line number of
/// the first line that is not a valid product or metafield object.
pub fn parse_bulk_jsonl(text: &str) -> Result<Vec<RawProduct>, CatalogError> {
    let mut products: Vec<RawProduct> = Vec::new();
    let mut index_by_id: HashMap<String, usize> = HashMap::new();

    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let context = || format!("bulk result line {}", n + 1);

        let mut value: Value = serde_json::from_str(line).map_err(|source| CatalogError::Deserialize {
            context: context(),
            source,
        })?;

        let parent_id = value
            .as_object_mut()
            .and_then(|obj| obj.remove(PARENT_ID_FIELD))
            .and_then(|v| v.as_str().map(str::to_owned));

        if let Some(parent_id) = parent_id {
            let metafield: Metafield = serde_json::from_value(value).map_err(|source| {
                CatalogError::Deserialize {
                    context: context(),
                    source,
                }
            })?;
            match index_by_id.get(&parent_id) {
                Some(&i) => products[i].metafields.push(metafield),
                None => tracing::warn!(
                    parent_id = %parent_id,
                    line = n + 1,
                    "bulk result child has no preceding parent, dropping it"
                ),
            }
            continue;
        }

        let node: ProductNode = serde_json::from_value(value).map_err(|source| CatalogError::Deserialize {
            context: context(),
            source,
        })?;
        let product = RawProduct::from(node);
        if let Some(id) = product.id.clone() {
            index_by_id.insert(id, products.len());
        }
        products.push(product);
    }

    Ok(products)
}
