pub mod csv_sink;
pub mod docstore;
pub mod error;

pub use csv_sink::{write_rows, DELIMITER};
pub use docstore::{DocstoreClient, UploadSummary};
pub use error::OutputError;
