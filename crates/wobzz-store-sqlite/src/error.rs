//! Error type for `wobzz-store-sqlite`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] wobzz_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("cannot read extract {path:?}: {source}")]
  Extract {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A bulk-loaded or inserted row did not fit the destination table.
  #[error("{table} row {row}: {detail}")]
  Rejected { table: String, row: usize, detail: String },

  #[error("table {table} has no column {column}")]
  UnknownColumn { table: String, column: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
