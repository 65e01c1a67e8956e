//! Error types for `wobzz-stage`.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot read {path:?}: {source}")]
  Read {
    path:   PathBuf,
    #[source]
    source: wobzz_core::Error,
  },

  #[error("cannot write {path:?}: {source}")]
  Write {
    path:   PathBuf,
    #[source]
    source: wobzz_core::Error,
  },

  #[error("source has no column {0:?}")]
  MissingColumn(String),

  #[error("column {0:?} is present on both sides of a join")]
  DuplicateColumn(String),

  #[error("calendar range is empty: {start} .. {end}")]
  CalendarRange { start: NaiveDate, end: NaiveDate },

  #[error("unknown dataset {0:?}")]
  UnknownDataset(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
