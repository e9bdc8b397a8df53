use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while writing the export file or re-uploading it.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The sink could not create, flush, or move the output file into place.
    #[error("failed to write {}: {source}", .path.display())]
    SinkWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload batch {batch} failed: {reason}")]
    UploadBatchFailed { batch: usize, reason: String },

    #[error("invalid docstore endpoint \"{url}\": {reason}")]
    InvalidEndpoint { url: String, reason: String },
}
