//! `export` and `bulk-export` command handlers.
//!
//! Both commands end the same way: normalize the fetched products, drop
//! duplicates, write the CSV, and print a one-line summary. They differ only
//! in how products are fetched.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use shopdoc_catalog::{
    build_rows, CatalogClient, FetchOutcome, NormalizationConfig, Paginator, PollPolicy,
    ProductSource, RawProduct,
};
use shopdoc_core::AppConfig;

/// Counts reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub exported: usize,
    pub skipped: usize,
    pub duplicates: usize,
}

impl RunSummary {
    fn print(&self, path: &Path) {
        println!(
            "exported {} rows to {} ({} skipped as malformed, {} duplicates dropped)",
            self.exported,
            path.display(),
            self.skipped,
            self.duplicates
        );
    }
}

/// # Errors
///
/// Returns an error if `SHOPIFY_ADMIN_TOKEN` is unset or the client cannot be
/// built.
pub(crate) fn build_catalog_client(config: &AppConfig) -> anyhow::Result<CatalogClient> {
    let admin_token = config
        .admin_token
        .as_deref()
        .context("SHOPIFY_ADMIN_TOKEN must be set to export")?;
    let client = CatalogClient::new(
        &config.shop_domain,
        &config.api_version,
        admin_token,
        config.request_timeout_secs,
    )
    .context("failed to build catalog client")?
    .with_retry(config.max_retries, config.retry_backoff_base_ms)
    .with_product_filter(config.product_filter.clone())
    .with_metafield_keys(config.metafield_keys.clone());
    Ok(client)
}

fn paginator(config: &AppConfig) -> Paginator {
    Paginator::new(config.page_size)
        .with_max_pages(config.max_pages)
        .with_inter_request_delay_ms(config.inter_request_delay_ms)
}

/// Runs a paginated export against the configured shop.
///
/// # Errors
///
/// Returns an error if the catalog fetch fails (after writing partial rows
/// when `partial` is set), a record is malformed under the `abort` policy, or
/// the file cannot be written.
pub(crate) async fn run_export(config: &AppConfig, partial: bool) -> anyhow::Result<()> {
    let client = build_catalog_client(config)?;
    export_from_source(&client, config, partial).await?;
    Ok(())
}

/// Fetches every page from `source`, then writes the export file.
///
/// Without `partial`, a fetch failure writes nothing. With it, the rows
/// collected before the failure are written and the resume cursor is
/// reported, but the run still fails.
pub(crate) async fn export_from_source<S: ProductSource>(
    source: &S,
    config: &AppConfig,
    partial: bool,
) -> anyhow::Result<RunSummary> {
    let FetchOutcome {
        products,
        pages,
        last_cursor,
        error,
    } = paginator(config)
        .run(source, config.start_cursor.as_deref())
        .await;

    let Some(err) = error else {
        tracing::info!(pages, products = products.len(), "catalog fetch complete");
        return write_export(config, &products);
    };

    if !partial {
        return Err(anyhow::Error::new(err).context(format!(
            "catalog fetch failed after {pages} pages; no file written"
        )));
    }

    write_export(config, &products)?;
    let resume = last_cursor.as_deref().unwrap_or("");
    println!("partial export: fetch stopped after {pages} pages; resume with --after {resume:?}");
    Err(anyhow::Error::new(err).context("catalog fetch failed; partial file written"))
}

/// Runs a bulk export and writes the export file.
///
/// # Errors
///
/// Returns an error if the bulk job is rejected, fails, times out, or its
/// result cannot be downloaded or written.
pub(crate) async fn run_bulk_export(config: &AppConfig) -> anyhow::Result<()> {
    let client = build_catalog_client(config)?;
    let policy = PollPolicy::new(
        Duration::from_secs(config.bulk_poll_interval_secs),
        Duration::from_secs(config.bulk_max_poll_interval_secs),
        config.bulk_max_polls,
    );

    let products = client
        .run_bulk_export(policy)
        .await
        .context("bulk export failed")?;
    write_export(config, &products)?;
    Ok(())
}

pub(crate) fn write_export(config: &AppConfig, products: &[RawProduct]) -> anyhow::Result<RunSummary> {
    let normalization = NormalizationConfig::from_app_config(config);
    let export = build_rows(
        products,
        &normalization,
        config.malformed_policy,
        config.dedup_key,
    )
    .context("normalization aborted on a malformed record")?;

    let exported = shopdoc_output::write_rows(&config.output_path, &export.rows, config.output_shape)
        .with_context(|| format!("failed to write {}", config.output_path.display()))?;

    let summary = RunSummary {
        exported,
        skipped: export.skipped,
        duplicates: export.duplicates,
    };
    summary.print(&config.output_path);
    Ok(summary)
}
