//! Error types for `wobzz-load`.

use std::path::PathBuf;

use thiserror::Error;
use wobzz_core::Sentinel;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] wobzz_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("cannot read input {path:?}: {source}")]
  Input {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed record in {path:?}: {source}")]
  Record {
    path:   PathBuf,
    #[source]
    source: csv::Error,
  },

  #[error("transaction reader stopped: {0}")]
  Reader(#[source] tokio::task::JoinError),

  #[error("cannot write bulk buffer {path:?}: {source}")]
  Buffer {
    path:   PathBuf,
    #[source]
    source: wobzz_core::Error,
  },

  /// The calendar dimension lacks a reserved row; it was not staged and
  /// loaded before the facts.
  #[error("calendar has no row for the {0:?} sentinel")]
  MissingSentinel(Sentinel),

  #[error("{table}: attribute {column} is required")]
  MissingAttribute { table: String, column: String },

  #[error("{table} has no column {column}")]
  UnknownColumn { table: String, column: String },

  #[error("{table}: {detail}")]
  Corrupt { table: String, detail: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
