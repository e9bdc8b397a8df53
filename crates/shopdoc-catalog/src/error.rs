use thiserror::Error;

/// Errors raised while talking to the catalog service.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by catalog API (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// The GraphQL layer rejected the query for exceeding the cost budget.
    #[error("catalog query throttled: {0}")]
    Throttled(String),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response carried an error payload instead of a product result set.
    #[error("catalog source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("page {page} reported more results but returned no usable cursor")]
    BrokenCursor { page: usize },

    #[error("pagination limit reached: exceeded {max_pages} pages")]
    PaginationLimit { max_pages: usize },

    #[error("bulk export rejected: {0}")]
    BulkRejected(String),

    #[error(
        "bulk operation {id} ended with status {status} (error code: {})",
        .error_code.as_deref().unwrap_or("none")
    )]
    JobFailed {
        id: String,
        status: String,
        error_code: Option<String>,
    },

    #[error("bulk operation {id} still running after {attempts} status checks")]
    JobTimedOut { id: String, attempts: u32 },

    #[error("invalid catalog endpoint for \"{domain}\": {reason}")]
    InvalidEndpoint { domain: String, reason: String },
}

/// Per-record failure raised by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("malformed record \"{title}\": {reason}")]
    MalformedRecord { title: String, reason: String },
}
