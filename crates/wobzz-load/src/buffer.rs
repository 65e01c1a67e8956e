//! Rows spooled to a local bulk file and written to the store in batches of
//! at most `bulk_size` rows, one bulk load per batch.

use std::{
  fmt,
  fs::{File, OpenOptions},
  io::BufWriter,
  path::{Path, PathBuf},
};

use wobzz_core::{
  Row, Warehouse,
  extract::{ExtractFormat, ExtractWriter},
  schema::TableDef,
};

use crate::{Error, Result};

/// Rows per bulk load unless configured otherwise.
pub const DEFAULT_BULK_SIZE: usize = 500_000;

/// Pending rows of one table, in the table's column order. Each row is
/// written to the bulk file as it is pushed; only the count stays in memory.
pub struct BulkBuffer {
  table:     &'static TableDef,
  path:      PathBuf,
  bulk_size: usize,
  writer:    Option<ExtractWriter<BufWriter<File>>>,
  pending:   usize,
}

impl BulkBuffer {
  /// A buffer spooling through `<dir>/<TABLE>.bulk`.
  pub fn new(table: &'static TableDef, dir: &Path) -> Self {
    Self {
      table,
      path: dir.join(table.bulk_file_name()),
      bulk_size: DEFAULT_BULK_SIZE,
      writer: None,
      pending: 0,
    }
  }

  /// Rows per batch; at least one.
  pub fn with_bulk_size(mut self, rows: usize) -> Self {
    self.bulk_size = rows.max(1);
    self
  }

  pub fn table(&self) -> &'static TableDef { self.table }

  pub fn len(&self) -> usize { self.pending }

  pub fn is_empty(&self) -> bool { self.pending == 0 }

  /// The batch is complete and should be flushed before more rows are pushed.
  pub fn is_full(&self) -> bool { self.pending >= self.bulk_size }

  pub fn push(&mut self, row: Row) -> Result<()> {
    if row.len() != self.table.columns.len() {
      return Err(Error::Corrupt {
        table:  self.table.qualified_name(),
        detail: format!("buffered row has {} cells, table has {}", row.len(), self.table.columns.len()),
      });
    }
    let buffer_err = |source| Error::Buffer { path: self.path.clone(), source };
    let mut writer = match self.writer.take() {
      Some(writer) => writer,
      // Append after a failed flush so the rows already spooled survive.
      None => {
        let file = OpenOptions::new()
          .write(true)
          .create(true)
          .append(self.pending > 0)
          .truncate(self.pending == 0)
          .open(&self.path)
          .map_err(|e| buffer_err(wobzz_core::Error::from(e)))?;
        ExtractWriter::new(BufWriter::new(file), ExtractFormat::bulk())
      }
    };
    let written = writer.write_row(&row);
    self.writer = Some(writer);
    written.map_err(buffer_err)?;
    self.pending += 1;
    Ok(())
  }

  /// Load the spooled rows in one transaction. The batch is dropped only
  /// once the load succeeded; a failed flush can be retried.
  pub async fn flush<W: Warehouse>(&mut self, store: &W) -> Result<u64> {
    if self.pending == 0 {
      return Ok(0);
    }
    if let Some(writer) = self.writer.take() {
      writer.finish().map_err(|source| Error::Buffer { path: self.path.clone(), source })?;
    }
    let loaded = store
      .bulk_load(self.table, self.path.clone(), ExtractFormat::bulk())
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    self.pending = 0;
    Ok(loaded)
  }
}

impl fmt::Debug for BulkBuffer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BulkBuffer")
      .field("table", &self.table.qualified_name())
      .field("path", &self.path)
      .field("bulk_size", &self.bulk_size)
      .field("pending", &self.pending)
      .finish_non_exhaustive()
  }
}

// ─── Fact table ──────────────────────────────────────────────────────────────

/// A fact table loaded in bulk: rows are appended to a local buffer and
/// reach the store on [`flush`](Self::flush), one batch at a time.
#[derive(Debug)]
pub struct BulkFactTable {
  buffer: BulkBuffer,
}

impl BulkFactTable {
  pub fn new(table: &'static TableDef, dir: &Path) -> Self { Self { buffer: BulkBuffer::new(table, dir) } }

  pub fn with_bulk_size(self, rows: usize) -> Self { Self { buffer: self.buffer.with_bulk_size(rows) } }

  /// Append a row given in the table's column order.
  pub fn insert(&mut self, row: Row) -> Result<()> { self.buffer.push(row) }

  pub fn pending(&self) -> usize { self.buffer.len() }

  pub fn is_full(&self) -> bool { self.buffer.is_full() }

  pub async fn flush<W: Warehouse>(&mut self, store: &W) -> Result<u64> {
    let loaded = self.buffer.flush(store).await?;
    tracing::info!(table = %self.buffer.table().qualified_name(), rows = loaded, "loaded facts");
    Ok(loaded)
  }
}

#[cfg(test)]
mod tests {
  use wobzz_core::schema::{ALL_TABLES, LAND};
  use wobzz_store_sqlite::SqliteStore;

  use super::*;

  async fn store() -> SqliteStore {
    let s = SqliteStore::open_in_memory().await.unwrap();
    s.create_tables(&ALL_TABLES).await.unwrap();
    s
  }

  fn land(id: i64, code: &str) -> Row { vec![Some(id.to_string()), Some(code.to_owned()), None] }

  #[test]
  fn rows_are_spooled_to_disk_as_they_are_pushed() {
    let dir = tempfile::tempdir().unwrap();
    let mut buffer = BulkBuffer::new(&LAND, dir.path());
    buffer.push(land(1, "NL")).unwrap();
    assert_eq!(buffer.len(), 1);
    assert!(dir.path().join(LAND.bulk_file_name()).exists());
  }

  #[tokio::test]
  async fn full_batches_flush_separately() {
    let s = store().await;
    let dir = tempfile::tempdir().unwrap();
    let mut buffer = BulkBuffer::new(&LAND, dir.path()).with_bulk_size(2);

    buffer.push(land(1, "NL")).unwrap();
    assert!(!buffer.is_full());
    buffer.push(land(2, "BE")).unwrap();
    assert!(buffer.is_full());
    assert_eq!(buffer.flush(&s).await.unwrap(), 2);
    assert!(buffer.is_empty());

    buffer.push(land(3, "DE")).unwrap();
    assert_eq!(buffer.flush(&s).await.unwrap(), 1);
    assert_eq!(buffer.flush(&s).await.unwrap(), 0);
    assert_eq!(s.row_count(&LAND).await.unwrap(), 3);
  }

  #[tokio::test]
  async fn a_failed_flush_keeps_the_batch() {
    let s = store().await;
    let dir = tempfile::tempdir().unwrap();
    let mut buffer = BulkBuffer::new(&LAND, dir.path());
    s.insert_row(&LAND, vec!["lnd_id", "lnd_land_code"], land(9, "NL")[..2].to_vec()).await.unwrap();

    buffer.push(land(1, "NL")).unwrap();
    assert!(buffer.flush(&s).await.is_err());
    assert_eq!(buffer.len(), 1);

    s.truncate(&LAND).await.unwrap();
    buffer.push(land(2, "BE")).unwrap();
    assert_eq!(buffer.flush(&s).await.unwrap(), 2);
    assert_eq!(s.row_count(&LAND).await.unwrap(), 2);
  }

  #[test]
  fn wrong_width_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let mut buffer = BulkBuffer::new(&LAND, dir.path());
    assert!(matches!(buffer.push(vec![None]), Err(Error::Corrupt { .. })));
    assert!(buffer.is_empty());
  }
}
