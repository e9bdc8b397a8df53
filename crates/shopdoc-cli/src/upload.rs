//! `upload` command handler.

use anyhow::Context;
use shopdoc_core::AppConfig;
use shopdoc_output::DocstoreClient;

use crate::UploadArgs;

/// Uploads the export file in batches.
///
/// # Errors
///
/// Returns an error if neither `DOCSTORE_COMPANY_ID` nor `DJANGO_COMPANY_ID`
/// is set, the file cannot be read, or any batch failed. Every batch is
/// attempted before failing.
pub(crate) async fn run_upload(config: &AppConfig, args: &UploadArgs) -> anyhow::Result<()> {
    let company_id = config
        .docstore_company_id
        .as_deref()
        .context("DOCSTORE_COMPANY_ID (or DJANGO_COMPANY_ID) must be set to upload")?;
    let file = args.file.as_ref().unwrap_or(&config.output_path);
    let batch_size = match args.batch_size {
        Some(n) => usize::try_from(n).context("--batch-size is too large")?,
        None => config.upload_batch_size,
    };
    let path_param = config.docstore_path();

    let client = DocstoreClient::new(&config.docstore_url, config.request_timeout_secs)
        .context("failed to build docstore client")?;
    let summary = client
        .upload_csv(file, company_id, &path_param, batch_size)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    println!(
        "uploaded {} rows from {} in {} batches ({} failed)",
        summary.rows_sent,
        file.display(),
        summary.sent,
        summary.failed.len()
    );

    if !summary.is_complete() {
        anyhow::bail!(
            "{} upload batches failed: {:?}",
            summary.failed.len(),
            summary.failed
        );
    }
    Ok(())
}
