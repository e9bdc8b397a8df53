//! `;`-delimited CSV sink.
//!
//! Rows are written to a hidden sibling file (`.name.csv.tmp`) which is
//! renamed over the target once everything is flushed, so readers never see
//! a half-written export.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use shopdoc_core::{OutputRow, OutputShape};

use crate::error::OutputError;

/// Field delimiter used for every file this crate writes or reads.
pub const DELIMITER: u8 = b';';

/// Writes a header plus one record per row to `path` in the given layout.
/// Returns the number of data rows written.
///
/// # Errors
///
/// Returns [`OutputError::SinkWriteFailed`] if the file cannot be created,
/// flushed, or renamed into place, and [`OutputError::Csv`] if a record
/// cannot be encoded. The target is left untouched on failure.
pub fn write_rows(path: &Path, rows: &[OutputRow], shape: OutputShape) -> Result<usize, OutputError> {
    let tmp = temp_path(path)?;

    if let Err(e) = write_file(&tmp, rows, shape) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        OutputError::SinkWriteFailed {
            path: path.to_path_buf(),
            source,
        }
    })?;

    tracing::info!(path = %path.display(), rows = rows.len(), shape = ?shape, "wrote export file");
    Ok(rows.len())
}

fn write_file(tmp: &Path, rows: &[OutputRow], shape: OutputShape) -> Result<(), OutputError> {
    let sink_err = |source| OutputError::SinkWriteFailed {
        path: tmp.to_path_buf(),
        source,
    };

    let file = File::create(tmp).map_err(sink_err)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(file);

    writer.write_record(shape.headers())?;
    for row in rows {
        writer.write_record(shape.record(row))?;
    }

    let file = writer.into_inner().map_err(|e| sink_err(e.into_error()))?;
    file.sync_all().map_err(sink_err)?;
    Ok(())
}

fn temp_path(path: &Path) -> Result<PathBuf, OutputError> {
    let name = path.file_name().ok_or_else(|| OutputError::SinkWriteFailed {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "output path has no file name"),
    })?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(name);
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}
