//! Loading staged dimension extracts (`DIM.<NAME>.csv`) produced by the
//! staging step.

use std::path::{Path, PathBuf};

use wobzz_core::{Warehouse, extract::ExtractFormat, schema::{TableDef, by_qualified_name}};

use crate::{Error, Result};

/// One loaded extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedExtract {
  pub table: String,
  pub path:  PathBuf,
  pub rows:  u64,
}

/// The destination table of a staged extract, from the first two
/// dot-separated parts of its file name.
pub fn table_for(path: &Path) -> Option<&'static TableDef> {
  let name = path.file_name()?.to_str()?;
  let mut parts = name.splitn(3, '.');
  let qualified = format!("{}.{}", parts.next()?, parts.next()?);
  by_qualified_name(&qualified)
}

/// Replace the contents of every dimension with a staged extract in
/// `staging_dir`. Extracts are loaded in file-name order; files naming no
/// known table are skipped.
pub async fn load_staged_dimensions<W: Warehouse>(
  store: &W,
  staging_dir: &Path,
) -> Result<Vec<LoadedExtract>> {
  let input_err = |source| Error::Input { path: staging_dir.to_owned(), source };
  let mut entries = tokio::fs::read_dir(staging_dir).await.map_err(input_err)?;
  let mut paths = Vec::new();
  while let Some(entry) = entries.next_entry().await.map_err(input_err)? {
    let path = entry.path();
    if path.extension().is_some_and(|e| e == "csv") {
      paths.push(path);
    }
  }
  paths.sort();

  let mut loaded = Vec::with_capacity(paths.len());
  for path in paths {
    let Some(table) = table_for(&path) else {
      tracing::warn!(path = %path.display(), "no table for staged extract; skipping");
      continue;
    };
    store.truncate(table).await.map_err(|e| Error::Store(Box::new(e)))?;
    let rows = store
      .bulk_load(table, path.clone(), ExtractFormat::staged())
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    tracing::info!(table = %table.qualified_name(), rows, "loaded staged extract");
    loaded.push(LoadedExtract { table: table.qualified_name(), path, rows });
  }
  Ok(loaded)
}
