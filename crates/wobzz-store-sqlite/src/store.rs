//! [`SqliteStore`]: the SQLite implementation of [`Warehouse`].

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use wobzz_core::{
  Row, Warehouse,
  extract::{ExtractFormat, ExtractReader},
  schema::{Column, TableDef},
};

use crate::{
  Error, Result,
  encode::{decode_value, encode_cell},
  schema::{PRAGMAS, insert, recreate_table, select},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A warehouse backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`. Tables are not created until
  /// [`Warehouse::create_tables`] is called.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  async fn init(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row encoding ────────────────────────────────────────────────────────────

fn resolve_columns(table: &TableDef, names: &[&'static str]) -> Result<Vec<&'static Column>> {
  names
    .iter()
    .map(|name| {
      table.column(name).ok_or_else(|| Error::UnknownColumn {
        table:  table.qualified_name(),
        column: (*name).to_owned(),
      })
    })
    .collect()
}

/// Encode `row` (1-based `line` for error reporting) against `columns`.
fn encode_row(
  table: &TableDef,
  columns: &[&'static Column],
  row: Row,
  line: usize,
) -> Result<Vec<Value>> {
  if row.len() != columns.len() {
    return Err(Error::Rejected {
      table:  table.qualified_name(),
      row:    line,
      detail: format!("expected {} fields, found {}", columns.len(), row.len()),
    });
  }
  columns
    .iter()
    .zip(row)
    .map(|(column, cell)| {
      encode_cell(column, cell).map_err(|detail| Error::Rejected {
        table: table.qualified_name(),
        row: line,
        detail,
      })
    })
    .collect()
}

// ─── Bulk loading ────────────────────────────────────────────────────────────

/// Stream the extract at `path` into `table` inside one transaction. Runs on
/// the connection thread; nothing is committed unless every row is accepted.
fn load_extract(
  conn: &mut rusqlite::Connection,
  table: &'static TableDef,
  path: &Path,
  format: ExtractFormat,
) -> Result<u64> {
  let input = std::fs::File::open(path)
    .map_err(|source| Error::Extract { path: path.to_owned(), source })?;
  let mut rows = ExtractReader::new(std::io::BufReader::new(input), format);
  let columns: Vec<&'static Column> = table.columns.iter().collect();

  let tx = conn.transaction().map_err(sql)?;
  let mut loaded = 0u64;
  {
    let mut stmt = tx.prepare(&insert(table, &columns)).map_err(sql)?;
    while let Some(row) = rows.next_row()? {
      let values = encode_row(table, &columns, row, loaded as usize + 1)?;
      stmt.execute(rusqlite::params_from_iter(values)).map_err(sql)?;
      loaded += 1;
    }
  }
  tx.commit().map_err(sql)?;
  Ok(loaded)
}

fn sql(e: rusqlite::Error) -> Error { Error::Database(e.into()) }

// ─── Warehouse impl ──────────────────────────────────────────────────────────

impl Warehouse for SqliteStore {
  type Error = Error;

  async fn create_tables(&self, tables: &'static [&'static TableDef]) -> Result<()> {
    let ddl: String = tables.iter().map(|t| recreate_table(t)).collect();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;
    tracing::info!(tables = tables.len(), "created warehouse tables");
    Ok(())
  }

  async fn truncate(&self, table: &'static TableDef) -> Result<u64> {
    let sql = format!("DELETE FROM {}", table.sql_name());
    let removed = self.conn.call(move |conn| Ok(conn.execute(&sql, [])?)).await?;
    tracing::debug!(table = %table.qualified_name(), removed, "truncated");
    Ok(removed as u64)
  }

  async fn bulk_load(
    &self,
    table: &'static TableDef,
    path: PathBuf,
    format: ExtractFormat,
  ) -> Result<u64> {
    let file = path.clone();
    let loaded = self
      .conn
      .call(move |conn| Ok(load_extract(conn, table, &file, format)))
      .await??;

    tracing::info!(table = %table.qualified_name(), path = %path.display(), rows = loaded, "bulk load complete");
    Ok(loaded)
  }

  async fn fetch_rows(
    &self,
    table: &'static TableDef,
    columns: Vec<&'static str>,
  ) -> Result<Vec<Row>> {
    resolve_columns(table, &columns)?;
    let sql = select(table, &columns);
    let width = columns.len();
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |r| {
            (0..width)
              .map(|i| r.get::<_, Value>(i).map(decode_value))
              .collect::<rusqlite::Result<Row>>()
          })?
          .collect::<rusqlite::Result<Vec<Row>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn insert_row(
    &self,
    table: &'static TableDef,
    columns: Vec<&'static str>,
    row: Row,
  ) -> Result<()> {
    let columns = resolve_columns(table, &columns)?;
    let values = encode_row(table, &columns, row, 1)?;
    let sql = insert(table, &columns);
    self
      .conn
      .call(move |conn| {
        conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn row_count(&self, table: &'static TableDef) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.sql_name());
    let count: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
      .await?;
    Ok(count as u64)
  }
}
