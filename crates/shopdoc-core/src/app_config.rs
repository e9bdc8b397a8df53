use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::export::{DedupKey, MalformedPolicy, OutputShape};

/// Fully resolved settings for one export or upload run.
#[derive(Clone)]
pub struct AppConfig {
    /// Shop subdomain (`acme`) or full host (`acme.myshopify.com`).
    pub shop_domain: String,
    /// Admin API token. Only the fetch commands need it.
    pub admin_token: Option<String>,
    pub api_version: String,
    /// Metafield allow-list, in the order the operator listed them.
    pub metafield_keys: Vec<String>,
    pub page_size: u32,
    pub start_cursor: Option<String>,
    /// Search predicate forwarded verbatim to the catalog query.
    pub product_filter: String,
    pub output_shape: OutputShape,
    pub output_path: PathBuf,
    pub truncate_marker: Option<String>,
    pub colours_key: Option<String>,
    /// Currency code to display symbol overrides, e.g. `AUD -> A$`.
    pub currency_symbols: BTreeMap<String, String>,
    pub dedup_key: DedupKey,
    pub malformed_policy: MalformedPolicy,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub inter_request_delay_ms: u64,
    pub max_pages: usize,
    pub bulk_poll_interval_secs: u64,
    pub bulk_max_poll_interval_secs: u64,
    pub bulk_max_polls: u32,
    pub docstore_company_id: Option<String>,
    pub docstore_url: String,
    /// Path parameter template; `{domain}` is replaced with [`Self::shop_domain`].
    pub docstore_path_template: String,
    pub upload_batch_size: usize,
    pub log_level: String,
}

impl AppConfig {
    /// The `path` query parameter sent with every docstore upload.
    #[must_use]
    pub fn docstore_path(&self) -> String {
        self.docstore_path_template
            .replace("{domain}", &self.shop_domain)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("shop_domain", &self.shop_domain)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[redacted]"))
            .field("api_version", &self.api_version)
            .field("metafield_keys", &self.metafield_keys)
            .field("page_size", &self.page_size)
            .field("start_cursor", &self.start_cursor)
            .field("product_filter", &self.product_filter)
            .field("output_shape", &self.output_shape)
            .field("output_path", &self.output_path)
            .field("truncate_marker", &self.truncate_marker)
            .field("colours_key", &self.colours_key)
            .field("currency_symbols", &self.currency_symbols)
            .field("dedup_key", &self.dedup_key)
            .field("malformed_policy", &self.malformed_policy)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field("max_pages", &self.max_pages)
            .field("bulk_poll_interval_secs", &self.bulk_poll_interval_secs)
            .field(
                "bulk_max_poll_interval_secs",
                &self.bulk_max_poll_interval_secs,
            )
            .field("bulk_max_polls", &self.bulk_max_polls)
            .field("docstore_company_id", &self.docstore_company_id)
            .field("docstore_url", &self.docstore_url)
            .field("docstore_path_template", &self.docstore_path_template)
            .field("upload_batch_size", &self.upload_batch_size)
            .field("log_level", &self.log_level)
            .finish()
    }
}
