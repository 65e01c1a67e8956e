//! The `Warehouse` trait: the backing store for dimension and fact tables.
//!
//! Implemented by storage backends (e.g. `wobzz-store-sqlite`). The staging
//! and loading layers depend on this abstraction, and receive the store as an
//! explicit handle rather than through any process-wide connection.

use std::{future::Future, path::PathBuf};

use crate::{extract::ExtractFormat, schema::TableDef};

/// One table row as text cells; `None` is SQL null.
pub type Row = Vec<Option<String>>;

/// Abstraction over the destination database.
///
/// Callers assume exclusive, single-writer access for the duration of a run.
pub trait Warehouse: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Drop (if present) and recreate every table in `tables`.
  fn create_tables(
    &self,
    tables: &'static [&'static TableDef],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete every row of `table`; returns the number of rows removed.
  fn truncate(
    &self,
    table: &'static TableDef,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Load every row of the extract at `path` into `table` in a single
  /// transaction. Fields are positional in the table's column order. Any
  /// rejected row aborts the whole load. Returns the number of rows loaded.
  fn bulk_load(
    &self,
    table: &'static TableDef,
    path: PathBuf,
    format: ExtractFormat,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Read `columns` of every row of `table`, used to prefill caches.
  fn fetch_rows(
    &self,
    table: &'static TableDef,
    columns: Vec<&'static str>,
  ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send + '_;

  /// Insert a single row, immediately and synchronously with respect to the
  /// caller. Columns not named are left to their defaults.
  fn insert_row(
    &self,
    table: &'static TableDef,
    columns: Vec<&'static str>,
    row: Row,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Number of rows currently in `table`.
  fn row_count(
    &self,
    table: &'static TableDef,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
