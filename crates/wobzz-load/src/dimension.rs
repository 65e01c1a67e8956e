//! Dimension tables as seen by the fact loader: a natural-key to
//! surrogate-key map, prefilled from the store and grown on demand.
//!
//! Attributes are passed per call as `(column, value)` pairs, so one
//! dimension can be resolved under several source roles (the treating and
//! the referring specialism both resolve through `DIM.ZORGVERLENERSOORT`).

use std::{collections::HashMap, path::Path};

use wobzz_core::{Row, SurrogateKey, Warehouse, schema::TableDef};

use crate::{Error, Result, buffer::BulkBuffer};

/// A dimension attribute: destination column and value.
pub type Attribute = (&'static str, String);

// ─── Key map ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct KeyMap {
  table:    &'static TableDef,
  key:      &'static str,
  keys:     HashMap<Vec<String>, SurrogateKey>,
  next_key: SurrogateKey,
  inserted: u64,
}

impl KeyMap {
  async fn prefill<W: Warehouse>(store: &W, table: &'static TableDef) -> Result<Self> {
    let key = table.key.ok_or_else(|| Error::Corrupt {
      table:  table.qualified_name(),
      detail: "not a dimension: no surrogate key".into(),
    })?;
    let mut columns = vec![key];
    columns.extend_from_slice(table.natural_key);
    let rows = store.fetch_rows(table, columns).await.map_err(|e| Error::Store(Box::new(e)))?;

    let mut keys = HashMap::with_capacity(rows.len());
    let mut max_key: SurrogateKey = 0;
    for row in rows {
      let mut cells = row.into_iter();
      let id = cells
        .next()
        .flatten()
        .and_then(|k| k.parse::<SurrogateKey>().ok())
        .ok_or_else(|| Error::Corrupt {
          table:  table.qualified_name(),
          detail: format!("non-integer {key}"),
        })?;
      max_key = max_key.max(id);
      keys.insert(cells.map(Option::unwrap_or_default).collect(), id);
    }
    tracing::debug!(table = %table.qualified_name(), rows = keys.len(), max_key, "prefilled dimension");

    Ok(Self { table, key, keys, next_key: max_key + 1, inserted: 0 })
  }

  /// The natural key of `attributes`, in the table's natural-key order.
  fn natural_key(&self, attributes: &[Attribute]) -> Result<Vec<String>> {
    self
      .table
      .natural_key
      .iter()
      .map(|column| {
        attributes
          .iter()
          .find(|(name, _)| name == column)
          .map(|(_, value)| value.clone())
          .ok_or_else(|| Error::MissingAttribute {
            table:  self.table.qualified_name(),
            column: (*column).to_owned(),
          })
      })
      .collect()
  }

  fn get(&self, natural_key: &[String]) -> Option<SurrogateKey> { self.keys.get(natural_key).copied() }

  /// Record a new natural key under the next free surrogate key.
  fn assign(&mut self, natural_key: Vec<String>) -> SurrogateKey {
    let id = self.next_key;
    self.next_key += 1;
    self.inserted += 1;
    tracing::debug!(table = %self.table.qualified_name(), key = id, natural_key = ?natural_key, "new dimension row");
    self.keys.insert(natural_key, id);
    id
  }
}

// ─── Cached dimension ────────────────────────────────────────────────────────

/// A dimension held entirely in memory. New rows are written to the store
/// immediately, one row at a time.
#[derive(Debug)]
pub struct CachedDimension {
  map: KeyMap,
}

impl CachedDimension {
  /// Load every existing row of `table`.
  pub async fn open<W: Warehouse>(store: &W, table: &'static TableDef) -> Result<Self> {
    Ok(Self { map: KeyMap::prefill(store, table).await? })
  }

  pub fn table(&self) -> &'static TableDef { self.map.table }

  /// Number of known natural keys.
  pub fn len(&self) -> usize { self.map.keys.len() }

  pub fn is_empty(&self) -> bool { self.map.keys.is_empty() }

  /// Rows added by [`ensure`](Self::ensure) since the dimension was opened.
  pub fn inserted(&self) -> u64 { self.map.inserted }

  /// The surrogate key of an existing row, for dimensions that are never
  /// grown during a load (the calendar).
  pub fn lookup(&self, natural_key: &[&str]) -> wobzz_core::Result<SurrogateKey> {
    let natural_key: Vec<String> = natural_key.iter().map(|v| (*v).to_owned()).collect();
    self.map.get(&natural_key).ok_or_else(|| wobzz_core::Error::NotFound {
      table: self.map.table.qualified_name(),
      key:   natural_key,
    })
  }

  /// The surrogate key for the natural key in `attributes`, inserting a new
  /// row built from `attributes` when the key is unknown.
  pub async fn ensure<W: Warehouse>(
    &mut self,
    store: &W,
    attributes: &[Attribute],
  ) -> Result<SurrogateKey> {
    let natural_key = self.map.natural_key(attributes)?;
    if let Some(id) = self.map.get(&natural_key) {
      return Ok(id);
    }

    let id = self.map.next_key;
    let mut columns = vec![self.map.key];
    let mut row: Row = vec![Some(id.to_string())];
    for (column, value) in attributes {
      columns.push(*column);
      row.push(Some(value.clone()));
    }
    store
      .insert_row(self.map.table, columns, row)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    Ok(self.map.assign(natural_key))
  }
}

// ─── Bulk dimension ──────────────────────────────────────────────────────────

/// A dimension with very many keys. New rows are buffered and reach the store
/// with one bulk load per [`flush`](Self::flush); until then the buffer is
/// authoritative.
#[derive(Debug)]
pub struct BulkDimension {
  map:    KeyMap,
  buffer: BulkBuffer,
}

impl BulkDimension {
  /// Load every existing row of `table`; new rows are buffered in `dir`.
  pub async fn open<W: Warehouse>(store: &W, table: &'static TableDef, dir: &Path) -> Result<Self> {
    Ok(Self { map: KeyMap::prefill(store, table).await?, buffer: BulkBuffer::new(table, dir) })
  }

  pub fn len(&self) -> usize { self.map.keys.len() }

  pub fn is_empty(&self) -> bool { self.map.keys.is_empty() }

  pub fn inserted(&self) -> u64 { self.map.inserted }

  /// Rows per bulk load of new keys.
  pub fn with_bulk_size(self, rows: usize) -> Self {
    Self { map: self.map, buffer: self.buffer.with_bulk_size(rows) }
  }

  /// Rows buffered but not yet flushed.
  pub fn pending(&self) -> usize { self.buffer.len() }

  pub fn is_full(&self) -> bool { self.buffer.is_full() }

  /// Like [`CachedDimension::ensure`], but the new row is buffered.
  pub fn ensure(&mut self, attributes: &[Attribute]) -> Result<SurrogateKey> {
    let natural_key = self.map.natural_key(attributes)?;
    if let Some(id) = self.map.get(&natural_key) {
      return Ok(id);
    }

    let table = self.map.table;
    let mut row: Row = vec![None; table.columns.len()];
    row[0] = Some(self.map.next_key.to_string());
    for (column, value) in attributes {
      let position = table.position(column).ok_or_else(|| Error::UnknownColumn {
        table:  table.qualified_name(),
        column: (*column).to_owned(),
      })?;
      row[position] = Some(value.clone());
    }
    self.buffer.push(row)?;
    Ok(self.map.assign(natural_key))
  }

  pub async fn flush<W: Warehouse>(&mut self, store: &W) -> Result<u64> {
    let loaded = self.buffer.flush(store).await?;
    tracing::info!(table = %self.map.table.qualified_name(), rows = loaded, "flushed dimension buffer");
    Ok(loaded)
  }
}

#[cfg(test)]
mod tests {
  use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
  };

  use wobzz_core::{
    extract::ExtractFormat,
    schema::{ALL_TABLES, DAG, SUBTRAJECTNUMMER, ZORGVERLENERSOORT},
  };
  use wobzz_store_sqlite::SqliteStore;

  use super::*;

  /// Delegates to SQLite, but the next `insert_row` fails once armed.
  struct FailingInsert {
    inner: SqliteStore,
    armed: AtomicBool,
  }

  impl Warehouse for FailingInsert {
    type Error = wobzz_store_sqlite::Error;

    async fn create_tables(&self, tables: &'static [&'static TableDef]) -> Result<(), Self::Error> {
      self.inner.create_tables(tables).await
    }

    async fn truncate(&self, table: &'static TableDef) -> Result<u64, Self::Error> {
      self.inner.truncate(table).await
    }

    async fn bulk_load(
      &self,
      table: &'static TableDef,
      path: PathBuf,
      format: ExtractFormat,
    ) -> Result<u64, Self::Error> {
      self.inner.bulk_load(table, path, format).await
    }

    async fn fetch_rows(
      &self,
      table: &'static TableDef,
      columns: Vec<&'static str>,
    ) -> Result<Vec<Row>, Self::Error> {
      self.inner.fetch_rows(table, columns).await
    }

    async fn insert_row(
      &self,
      table: &'static TableDef,
      columns: Vec<&'static str>,
      row: Row,
    ) -> Result<(), Self::Error> {
      if self.armed.swap(false, Ordering::SeqCst) {
        return Err(wobzz_store_sqlite::Error::Rejected {
          table:  table.qualified_name(),
          row:    1,
          detail: "connection reset".into(),
        });
      }
      self.inner.insert_row(table, columns, row).await
    }

    async fn row_count(&self, table: &'static TableDef) -> Result<u64, Self::Error> {
      self.inner.row_count(table).await
    }
  }

  async fn store() -> SqliteStore {
    let s = SqliteStore::open_in_memory().await.unwrap();
    s.create_tables(&ALL_TABLES).await.unwrap();
    s
  }

  fn code(value: &str) -> Vec<Attribute> {
    vec![("zvs_vektis_zorgverlenersoort_code", value.to_owned())]
  }

  #[tokio::test]
  async fn ensure_is_idempotent_and_writes_through() {
    let s = store().await;
    let mut dim = CachedDimension::open(&s, &ZORGVERLENERSOORT).await.unwrap();

    let a = dim.ensure(&s, &code("0303")).await.unwrap();
    let b = dim.ensure(&s, &code("0330")).await.unwrap();
    assert_eq!((a, b), (1, 2));
    assert_eq!(dim.ensure(&s, &code("0303")).await.unwrap(), a);
    assert_eq!(dim.inserted(), 2);
    assert_eq!(s.row_count(&ZORGVERLENERSOORT).await.unwrap(), 2);
  }

  #[tokio::test]
  async fn keys_continue_after_prefilled_rows() {
    let s = store().await;
    let cols = vec!["zvs_id", "zvs_vektis_zorgverlenersoort_code"];
    s.insert_row(&ZORGVERLENERSOORT, cols.clone(), vec![Some("-1".into()), Some("_?_".into())])
      .await
      .unwrap();
    s.insert_row(&ZORGVERLENERSOORT, cols, vec![Some("7".into()), Some("0303".into())])
      .await
      .unwrap();

    let mut dim = CachedDimension::open(&s, &ZORGVERLENERSOORT).await.unwrap();
    assert_eq!(dim.ensure(&s, &code("_?_")).await.unwrap(), -1);
    assert_eq!(dim.ensure(&s, &code("0303")).await.unwrap(), 7);
    assert_eq!(dim.ensure(&s, &code("0501")).await.unwrap(), 8);
  }

  #[tokio::test]
  async fn first_key_of_an_empty_or_sentinel_only_table_is_one() {
    let s = store().await;
    s.insert_row(&ZORGVERLENERSOORT, vec!["zvs_id", "zvs_vektis_zorgverlenersoort_code"], vec![
      Some("-4".into()),
      Some("open".into()),
    ])
    .await
    .unwrap();
    let mut dim = CachedDimension::open(&s, &ZORGVERLENERSOORT).await.unwrap();
    assert_eq!(dim.ensure(&s, &code("0303")).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn failed_insert_neither_skips_nor_reuses_a_key() {
    let s = FailingInsert { inner: store().await, armed: AtomicBool::new(true) };
    let mut dim = CachedDimension::open(&s, &ZORGVERLENERSOORT).await.unwrap();

    let err = dim.ensure(&s, &code("0303")).await.unwrap_err();
    assert!(matches!(err, Error::Store(_)), "{err:?}");
    assert_eq!(dim.inserted(), 0);
    assert!(dim.is_empty());

    assert_eq!(dim.ensure(&s, &code("0303")).await.unwrap(), 1);
    assert_eq!(dim.ensure(&s, &code("0330")).await.unwrap(), 2);
    assert_eq!(dim.ensure(&s, &code("0303")).await.unwrap(), 1);

    let rows = s
      .fetch_rows(&ZORGVERLENERSOORT, vec!["zvs_id", "zvs_vektis_zorgverlenersoort_code"])
      .await
      .unwrap();
    assert_eq!(rows, vec![
      vec![Some("1".into()), Some("0303".into())],
      vec![Some("2".into()), Some("0330".into())],
    ]);
  }

  #[tokio::test]
  async fn lookup_miss_is_not_found() {
    let s = store().await;
    let dim = CachedDimension::open(&s, &DAG).await.unwrap();
    assert!(matches!(dim.lookup(&["2012-01-01"]), Err(wobzz_core::Error::NotFound { .. })));
  }

  #[tokio::test]
  async fn missing_natural_key_attribute_is_an_error() {
    let s = store().await;
    let mut dim = CachedDimension::open(&s, &ZORGVERLENERSOORT).await.unwrap();
    let err = dim.ensure(&s, &[("zvs_specialisme", "x".to_owned())]).await.unwrap_err();
    assert!(matches!(err, Error::MissingAttribute { .. }));
  }

  #[tokio::test]
  async fn bulk_dimension_buffers_until_flush() {
    let s = store().await;
    let dir = tempfile::tempdir().unwrap();
    let mut dim = BulkDimension::open(&s, &SUBTRAJECTNUMMER, dir.path()).await.unwrap();

    let attrs = |id: &str| -> Vec<Attribute> {
      vec![("stn_subtraject_id", id.to_owned()), ("stn_subtrajectnummer", "1".to_owned())]
    };
    assert_eq!(dim.ensure(&attrs("A")).unwrap(), 1);
    assert_eq!(dim.ensure(&attrs("B")).unwrap(), 2);
    assert_eq!(dim.ensure(&attrs("A")).unwrap(), 1);
    assert_eq!(dim.pending(), 2);
    assert_eq!(s.row_count(&SUBTRAJECTNUMMER).await.unwrap(), 0);

    assert_eq!(dim.flush(&s).await.unwrap(), 2);
    assert_eq!(dim.pending(), 0);
    assert_eq!(s.row_count(&SUBTRAJECTNUMMER).await.unwrap(), 2);

    // A second run continues the sequence.
    let mut dim = BulkDimension::open(&s, &SUBTRAJECTNUMMER, dir.path()).await.unwrap();
    assert_eq!(dim.ensure(&attrs("A")).unwrap(), 1);
    assert_eq!(dim.ensure(&attrs("C")).unwrap(), 3);
  }

  #[tokio::test]
  async fn bulk_dimension_reports_a_full_batch() {
    let s = store().await;
    let dir = tempfile::tempdir().unwrap();
    let mut dim = BulkDimension::open(&s, &SUBTRAJECTNUMMER, dir.path()).await.unwrap().with_bulk_size(2);

    let attrs = |id: &str| -> Vec<Attribute> { vec![("stn_subtraject_id", id.to_owned())] };
    dim.ensure(&attrs("A")).unwrap();
    assert!(!dim.is_full());
    dim.ensure(&attrs("A")).unwrap();
    assert!(!dim.is_full());
    dim.ensure(&attrs("B")).unwrap();
    assert!(dim.is_full());
    assert_eq!(dim.flush(&s).await.unwrap(), 2);
    assert!(!dim.is_full());
  }
}
