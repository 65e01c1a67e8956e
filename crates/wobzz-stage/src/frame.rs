//! [`Frame`]: a small in-memory table of optional text cells, with just the
//! relational operations the staging transforms need.
//!
//! Cells are `None` for an empty source field. Row order is significant
//! throughout: deduplication keeps the last occurrence of a key, and
//! surrogate keys are handed out in the order rows end up in.

use std::{
  collections::{HashMap, HashSet},
  fs::File,
  io::{BufReader, Read},
  path::{Path, PathBuf},
};

use encoding_rs::Encoding;
use wobzz_core::{
  Row,
  extract::{ExtractFormat, ExtractWriter, decode_record, reader},
  schema::TableDef,
  sentinel::SurrogateKey,
};

use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
  columns: Vec<String>,
  rows:    Vec<Row>,
}

impl Frame {
  pub fn new(columns: &[&str], rows: Vec<Row>) -> Self {
    Self { columns: columns.iter().map(|c| (*c).to_owned()).collect(), rows }
  }

  /// Read a `;`-delimited file with a header row, decoding with `encoding`.
  pub fn read_csv<R: Read>(input: R, encoding: &'static Encoding) -> wobzz_core::Result<Self> {
    let mut rdr = reader(input, b';', true);
    let columns = decode_record(rdr.byte_headers()?, encoding)
      .into_iter()
      .map(|name| name.trim_start_matches('\u{feff}').trim().to_owned())
      .collect::<Vec<String>>();
    let mut rows = Vec::new();
    let mut record = csv::ByteRecord::new();
    while rdr.read_byte_record(&mut record)? {
      let mut row: Row = decode_record(&record, encoding)
        .into_iter()
        .map(|field| (!field.is_empty()).then_some(field))
        .collect();
      row.resize(columns.len(), None);
      rows.push(row);
    }
    Ok(Self { columns, rows })
  }

  pub fn read_path(path: &Path, encoding: &'static Encoding) -> Result<Self> {
    let read = || -> wobzz_core::Result<Self> {
      let file = File::open(path)?;
      Self::read_csv(BufReader::new(file), encoding)
    };
    let frame = read().map_err(|source| Error::Read { path: path.to_owned(), source })?;
    tracing::debug!(path = %path.display(), rows = frame.len(), "read reference file");
    Ok(frame)
  }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn columns(&self) -> &[String] { &self.columns }

  pub fn rows(&self) -> &[Row] { &self.rows }

  pub fn index(&self, column: &str) -> Result<usize> {
    self
      .columns
      .iter()
      .position(|c| c == column)
      .ok_or_else(|| Error::MissingColumn(column.to_owned()))
  }

  /// The cell at `row`, `column`; `None` for a null cell or unknown column.
  pub fn get(&self, row: usize, column: &str) -> Option<&str> {
    let i = self.index(column).ok()?;
    self.rows.get(row)?.get(i)?.as_deref()
  }

  // ─── Row selection ─────────────────────────────────────────────────────────

  /// Keep the rows whose `column` equals `value`.
  pub fn filter_eq(mut self, column: &str, value: &str) -> Result<Self> {
    let i = self.index(column)?;
    self.rows.retain(|row| row.get(i).and_then(|c| c.as_deref()) == Some(value));
    Ok(self)
  }

  /// Deduplicate on `keys`, keeping the last occurrence of every key in its
  /// original position.
  pub fn drop_duplicates_keep_last(mut self, keys: &[&str]) -> Result<Self> {
    let idx = self.indices(keys)?;
    let mut seen = HashSet::new();
    let mut kept: Vec<Row> = Vec::with_capacity(self.rows.len());
    for row in self.rows.into_iter().rev() {
      if seen.insert(key_of(&row, &idx)) {
        kept.push(row);
      }
    }
    kept.reverse();
    self.rows = kept;
    Ok(self)
  }

  // ─── Column operations ─────────────────────────────────────────────────────

  /// Keep only the mapped source columns, renamed, in mapping order.
  pub fn select(self, mapping: &[(&str, &str)]) -> Result<Self> {
    let idx: Vec<usize> = mapping
      .iter()
      .map(|(source, _)| self.index(source))
      .collect::<Result<_>>()?;
    let rows = self
      .rows
      .into_iter()
      .map(|row| idx.iter().map(|&i| row.get(i).cloned().flatten()).collect())
      .collect();
    Ok(Self { columns: mapping.iter().map(|(_, to)| (*to).to_owned()).collect(), rows })
  }

  /// Replace every cell of `column` with `f(cell)`.
  pub fn map_column(
    &mut self,
    column: &str,
    f: impl Fn(Option<&str>) -> Option<String>,
  ) -> Result<()> {
    let i = self.index(column)?;
    for row in &mut self.rows {
      let cell = f(row[i].as_deref());
      row[i] = cell;
    }
    Ok(())
  }

  /// Set `column` to `f(row)` for every row, appending the column if absent.
  pub fn set_column(&mut self, column: &str, mut f: impl FnMut(usize) -> Option<String>) {
    let i = match self.index(column) {
      Ok(i) => i,
      Err(_) => {
        self.columns.push(column.to_owned());
        for row in &mut self.rows {
          row.push(None);
        }
        self.columns.len() - 1
      }
    };
    for (n, row) in self.rows.iter_mut().enumerate() {
      row[i] = f(n);
    }
  }

  // ─── Joins ─────────────────────────────────────────────────────────────────

  /// Inner join with `other` on the columns `on`, which both frames must
  /// have. Every other column of `other` is appended. Rows of `self` without
  /// a match are dropped.
  pub fn inner_join(self, other: &Frame, on: &[&str]) -> Result<Self> {
    let left = self.indices(on)?;
    let right = other.indices(on)?;
    let extra: Vec<usize> = (0..other.columns.len()).filter(|i| !right.contains(i)).collect();
    for &i in &extra {
      if self.columns.contains(&other.columns[i]) {
        return Err(Error::DuplicateColumn(other.columns[i].clone()));
      }
    }

    let mut matches: HashMap<Vec<Option<String>>, Vec<usize>> = HashMap::new();
    for (n, row) in other.rows.iter().enumerate() {
      matches.entry(key_of(row, &right)).or_default().push(n);
    }

    let before = self.rows.len();
    let mut rows = Vec::with_capacity(before);
    for row in self.rows {
      let Some(hits) = matches.get(&key_of(&row, &left)) else {
        continue;
      };
      for &n in hits {
        let mut joined = row.clone();
        joined.extend(extra.iter().map(|&i| other.rows[n][i].clone()));
        rows.push(joined);
      }
    }

    let unmatched = before.saturating_sub(rows.len());
    if unmatched > 0 {
      tracing::warn!(on = ?on, dropped = unmatched, kept = rows.len(), "inner join dropped unmatched rows");
    }

    let mut columns = self.columns;
    columns.extend(extra.iter().map(|&i| other.columns[i].clone()));
    Ok(Self { columns, rows })
  }

  // ─── Output ────────────────────────────────────────────────────────────────

  /// Turn the frame into the rows of `table`: surrogate keys `1..=n` in
  /// current row order, `sentinel` appended, columns reordered to the table's
  /// column order (absent columns become empty strings), sorted by key.
  pub fn into_table(mut self, table: &TableDef, sentinel: Row) -> Vec<Row> {
    if let Some(key) = table.key {
      self.set_column(key, |n| Some((n + 1).to_string()));
    }
    let idx: Vec<Option<usize>> =
      table.columns.iter().map(|c| self.index(c.name).ok()).collect();
    let mut rows: Vec<Row> = self
      .rows
      .into_iter()
      .map(|row| {
        idx
          .iter()
          .map(|i| match i {
            Some(i) => row[*i].clone(),
            None => Some(String::new()),
          })
          .collect()
      })
      .collect();
    rows.push(sentinel);
    rows.sort_by_key(surrogate_key);
    rows
  }

  fn indices(&self, columns: &[&str]) -> Result<Vec<usize>> {
    columns.iter().map(|c| self.index(c)).collect()
  }
}

fn key_of(row: &Row, idx: &[usize]) -> Vec<Option<String>> {
  idx.iter().map(|&i| row.get(i).cloned().flatten()).collect()
}

fn surrogate_key(row: &Row) -> SurrogateKey {
  row
    .first()
    .and_then(|c| c.as_deref())
    .and_then(|c| c.parse().ok())
    .unwrap_or(SurrogateKey::MAX)
}

/// Write `rows` of `table` as a staged extract in `dir`; returns its path.
pub fn write_extract(
  dir: &Path,
  table: &TableDef,
  rows: &[Row],
  format: ExtractFormat,
) -> Result<PathBuf> {
  let path = dir.join(table.extract_file_name());
  let write = || -> wobzz_core::Result<()> {
    let file = std::io::BufWriter::new(File::create(&path)?);
    let mut w = ExtractWriter::new(file, format);
    w.write_header(&table.column_names())?;
    for row in rows {
      w.write_row(row)?;
    }
    w.finish()?;
    Ok(())
  };
  write().map_err(|source| Error::Write { path: path.clone(), source })?;
  Ok(path)
}
