//! Re-upload of an export file to the document-store ingestion endpoint.
//!
//! The file is split into batches of at most `batch_size` data records. Each
//! batch is re-encoded as a standalone CSV (header + records) and POSTed as
//! the multipart file field `docs`, with the company id and a domain-derived
//! path as query parameters. Batches go out one at a time; a failed batch is
//! logged and the rest are still sent.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};

use crate::csv_sink::DELIMITER;
use crate::error::OutputError;

const DOCS_FIELD: &str = "docs";
const DEFAULT_FILE_NAME: &str = "export.csv";

/// Outcome of an upload run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Batches accepted by the endpoint.
    pub sent: usize,
    /// Batch numbers (1-based) that failed.
    pub failed: Vec<usize>,
    /// Data records contained in accepted batches.
    pub rows_sent: usize,
}

impl UploadSummary {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct DocstoreClient {
    client: Client,
    base_url: Url,
}

impl DocstoreClient {
    /// # Errors
    ///
    /// Returns [`OutputError::InvalidEndpoint`] if `base_url` does not parse,
    /// or [`OutputError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, OutputError> {
        let base_url = Url::parse(base_url).map_err(|e| OutputError::InvalidEndpoint {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Uploads the CSV at `path` in batches.
    ///
    /// # Errors
    ///
    /// Only fails when the file cannot be read or parsed. Per-batch failures
    /// are reported in [`UploadSummary::failed`].
    pub async fn upload_csv(
        &self,
        path: &Path,
        company_id: &str,
        path_param: &str,
        batch_size: usize,
    ) -> Result<UploadSummary, OutputError> {
        let bytes = tokio::fs::read(path).await?;
        let batches = split_batches(&bytes, batch_size)?;
        let file_name = path
            .file_name()
            .map_or_else(|| DEFAULT_FILE_NAME.to_owned(), |n| n.to_string_lossy().into_owned());

        if batches.is_empty() {
            tracing::warn!(path = %path.display(), "export file has no data rows; nothing uploaded");
            return Ok(UploadSummary::default());
        }

        let total = batches.len();
        let mut summary = UploadSummary::default();
        for (i, batch) in batches.into_iter().enumerate() {
            let number = i + 1;
            match self
                .send_batch(number, batch.body, &file_name, company_id, path_param)
                .await
            {
                Ok(()) => {
                    tracing::info!(batch = number, total, rows = batch.rows, "upload batch sent");
                    summary.sent += 1;
                    summary.rows_sent += batch.rows;
                }
                Err(e) => {
                    tracing::warn!(batch = number, total, error = %e, "upload batch failed; continuing");
                    summary.failed.push(number);
                }
            }
        }
        Ok(summary)
    }

    async fn send_batch(
        &self,
        batch: usize,
        body: Vec<u8>,
        file_name: &str,
        company_id: &str,
        path_param: &str,
    ) -> Result<(), OutputError> {
        let failed = |reason: String| OutputError::UploadBatchFailed { batch, reason };

        let part = Part::bytes(body)
            .file_name(file_name.to_owned())
            .mime_str("text/csv")
            .map_err(|e| failed(e.to_string()))?;
        let form = Form::new().part(DOCS_FIELD, part);

        let response = self
            .client
            .post(self.base_url.clone())
            .query(&[("company", company_id), ("path", path_param)])
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failed(format!("HTTP {status}: {}", body.trim())));
        }
        Ok(())
    }
}

/// One encoded chunk: header plus up to `batch_size` records.
#[derive(Debug)]
struct Batch {
    body: Vec<u8>,
    rows: usize,
}

/// Splits a `;`-delimited CSV into standalone chunks. Records are parsed, not
/// split on line breaks, so quoted multi-line fields stay intact.
fn split_batches(bytes: &[u8], batch_size: usize) -> Result<Vec<Batch>, OutputError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_reader(bytes);
    let headers = reader.byte_headers()?.clone();
    let records = reader.byte_records().collect::<Result<Vec<_>, _>>()?;

    records
        .chunks(batch_size.max(1))
        .map(|chunk| {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(DELIMITER)
                .from_writer(Vec::new());
            writer.write_byte_record(&headers)?;
            for record in chunk {
                writer.write_byte_record(record)?;
            }
            let body = writer
                .into_inner()
                .map_err(|e| OutputError::Io(e.into_error()))?;
            Ok(Batch {
                body,
                rows: chunk.len(),
            })
        })
        .collect()
}
