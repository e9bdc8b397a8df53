pub mod bulk;
pub mod client;
pub mod dedup;
pub mod error;
pub mod html;
pub mod normalize;
pub mod pagination;
pub mod pipeline;
pub mod price;
mod query;
mod rate_limit;
pub mod types;

pub use bulk::{parse_bulk_jsonl, BulkOperation, BulkStatus, PollPolicy};
pub use client::CatalogClient;
pub use dedup::Deduplicator;
pub use error::{CatalogError, NormalizeError};
pub use normalize::{normalize_product, NormalizationConfig};
pub use pagination::{FetchOutcome, PaginationState, Paginator, ProductSource};
pub use pipeline::{build_rows, ExportRows};
pub use types::{Metafield, Money, PageResult, PriceRange, ProductOption, RawProduct};
