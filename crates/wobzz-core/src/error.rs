//! Error types for `wobzz-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no row in {table} for natural key {key:?}")]
  NotFound { table: String, key: Vec<String> },

  #[error("unknown text encoding label: {0:?}")]
  UnknownEncoding(String),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
