//! Durable result persistence
//!
//! Append-only CSV sink. Each completed row is appended and flushed before
//! the next session starts, so a crash after N rows leaves exactly N valid
//! rows on disk and never a partial one. The header is written once, only
//! when the file is newly created or empty; appending to a pre-existing
//! output is a supported pattern for multi-invocation experiments, and the
//! existing header is neither rewritten nor validated.

use crate::record::{RoundRow, RunResult};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Write failures; fatal to the whole benchmark, since the persisted
/// results are the product
#[derive(Debug, Error)]
pub enum OutputError {
    /// The output file could not be opened
    #[error("failed to open output file {path}: {source}")]
    Open {
        /// The configured output path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A record could not be serialized or written
    #[error("failed to append row: {0}")]
    Write(#[from] csv::Error),

    /// The append could not be made durable
    #[error("failed to flush output: {0}")]
    Flush(#[source] std::io::Error),
}

/// Append-only writer owning the output file handle exclusively
pub struct CsvResultWriter {
    writer: csv::Writer<File>,
    runs: usize,
}

impl CsvResultWriter {
    /// Open (or create) the output and write the header if the file is new
    pub fn open(path: &Path, runs: usize) -> Result<Self, OutputError> {
        let open_err = |source| OutputError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_err)?;
        let fresh = file.metadata().map_err(open_err)?.len() == 0;

        let mut writer = csv::Writer::from_writer(file);
        if fresh {
            let mut header = vec!["kernel path".to_string(), "round".to_string()];
            header.extend((0..runs).map(|i| format!("run {i}")));
            writer.write_record(&header)?;
            writer.flush().map_err(OutputError::Flush)?;
        }

        Ok(Self { writer, runs })
    }

    /// Append one row and flush; a failed run becomes an empty field
    pub fn append(&mut self, row: &RoundRow) -> Result<(), OutputError> {
        debug_assert_eq!(row.runs.len(), self.runs, "row length mismatch");

        let mut record = Vec::with_capacity(self.runs + 2);
        record.push(row.kernel.clone());
        record.push(row.round.to_string());
        for run in &row.runs {
            record.push(match run {
                RunResult::Measured(value) => value.to_string(),
                RunResult::Failed(_) => String::new(),
            });
        }

        self.writer.write_record(&record)?;
        self.writer.flush().map_err(OutputError::Flush)?;
        Ok(())
    }
}
