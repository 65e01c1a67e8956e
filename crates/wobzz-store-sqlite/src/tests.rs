//! Integration tests for `SqliteStore` against an in-memory database.

use std::path::PathBuf;

use wobzz_core::{
  Warehouse,
  extract::{ExtractFormat, ExtractWriter},
  schema::{ALL_TABLES, DAG, LAND, SUBTRAJECT, SUBTRAJECTNUMMER, ZORGTYPE},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  let s = SqliteStore::open_in_memory().await.expect("in-memory store");
  s.create_tables(&ALL_TABLES).await.expect("tables");
  s
}

fn row(cells: &[&str]) -> Vec<Option<String>> {
  cells.iter().map(|c| (!c.is_empty()).then(|| c.to_string())).collect()
}

/// Write `rows` as a bulk extract into `dir`.
fn bulk_file(dir: &tempfile::TempDir, name: &str, rows: &[Vec<Option<String>>]) -> PathBuf {
  let path = dir.path().join(name);
  let file = std::fs::File::create(&path).unwrap();
  let mut w = ExtractWriter::new(file, ExtractFormat::bulk());
  for r in rows {
    w.write_row(r).unwrap();
  }
  w.finish().unwrap();
  path
}

// ─── Tables ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_tables_is_repeatable() {
  let s = store().await;
  s.insert_row(&LAND, vec!["lnd_id", "lnd_land_code"], row(&["1", "NL"])).await.unwrap();
  s.create_tables(&ALL_TABLES).await.unwrap();
  assert_eq!(s.row_count(&LAND).await.unwrap(), 0);
}

#[tokio::test]
async fn truncate_reports_removed_rows() {
  let s = store().await;
  s.insert_row(&LAND, vec!["lnd_id", "lnd_land_code"], row(&["1", "NL"])).await.unwrap();
  s.insert_row(&LAND, vec!["lnd_id", "lnd_land_code"], row(&["2", "BE"])).await.unwrap();
  assert_eq!(s.truncate(&LAND).await.unwrap(), 2);
  assert_eq!(s.row_count(&LAND).await.unwrap(), 0);
}

// ─── Single rows ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_fetch_round_trip() {
  let s = store().await;
  s.insert_row(
    &ZORGTYPE,
    vec!["zgt_id", "zgt_dbc_specialisme_code", "zgt_dbc_zorgtype_code"],
    row(&["1", "0303", "11"]),
  )
  .await
  .unwrap();

  let rows = s
    .fetch_rows(&ZORGTYPE, vec!["zgt_id", "zgt_dbc_zorgtype_code", "zgt_dbc_begindatum"])
    .await
    .unwrap();
  assert_eq!(rows, vec![vec![Some("1".into()), Some("11".into()), None]]);
}

#[tokio::test]
async fn duplicate_natural_key_is_a_database_error() {
  let s = store().await;
  let cols = vec!["stn_id", "stn_subtraject_id"];
  s.insert_row(&SUBTRAJECTNUMMER, cols.clone(), row(&["1", "A"])).await.unwrap();
  let err = s.insert_row(&SUBTRAJECTNUMMER, cols, row(&["2", "A"])).await.unwrap_err();
  assert!(matches!(err, Error::Database(_)), "{err:?}");
}

#[tokio::test]
async fn unknown_column_is_rejected() {
  let s = store().await;
  let err = s.fetch_rows(&LAND, vec!["nope"]).await.unwrap_err();
  assert!(matches!(err, Error::UnknownColumn { .. }));
}

// ─── Bulk loads ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_load_fills_defaults_for_empty_fields() {
  let s = store().await;
  let dir = tempfile::tempdir().unwrap();
  let mut cells = vec![None; SUBTRAJECT.columns.len()];
  cells[20] = Some("12.34".to_string());
  let path = bulk_file(&dir, "facts.bulk", &[cells]);

  let n = s.bulk_load(&SUBTRAJECT, path, ExtractFormat::bulk()).await.unwrap();
  assert_eq!(n, 1);

  let rows = s
    .fetch_rows(
      &SUBTRAJECT,
      vec!["beh_id", "dag_id_declaratiedatum", "geslacht", "is_hoofdtraject", "fct_omzet_ziekenhuis"],
    )
    .await
    .unwrap();
  assert_eq!(rows, vec![vec![
    Some("-1".into()),
    Some("-4".into()),
    Some("0".into()),
    None,
    Some("12.34".into()),
  ]]);
}

#[tokio::test]
async fn bulk_load_normalises_dates() {
  let s = store().await;
  let dir = tempfile::tempdir().unwrap();
  let path = bulk_file(&dir, "dag.bulk", &[row(&[
    "7",
    "2012-01-05 00:00:00",
    "2012",
    "1",
    "1",
    "1",
    "2012-01",
    "2012-01",
  ])]);

  s.bulk_load(&DAG, path, ExtractFormat::bulk()).await.unwrap();
  let rows = s.fetch_rows(&DAG, vec!["dag_datum"]).await.unwrap();
  assert_eq!(rows, vec![vec![Some("2012-01-05".into())]]);
}

#[tokio::test]
async fn bulk_load_rejects_malformed_rows_and_loads_nothing() {
  let s = store().await;
  let dir = tempfile::tempdir().unwrap();
  let path = bulk_file(&dir, "land.bulk", &[row(&["1", "NL", "Nederland"]), row(&["x", "BE", "België"])]);

  let err = s.bulk_load(&LAND, path, ExtractFormat::bulk()).await.unwrap_err();
  assert!(matches!(err, Error::Rejected { row: 2, .. }), "{err:?}");
  assert_eq!(s.row_count(&LAND).await.unwrap(), 0);
}

#[tokio::test]
async fn bulk_load_rejects_wrong_field_count() {
  let s = store().await;
  let dir = tempfile::tempdir().unwrap();
  let path = bulk_file(&dir, "land.bulk", &[row(&["1", "NL"])]);

  let err = s.bulk_load(&LAND, path, ExtractFormat::bulk()).await.unwrap_err();
  assert!(matches!(err, Error::Rejected { row: 1, .. }), "{err:?}");
}

#[tokio::test]
async fn bulk_load_rolls_back_on_constraint_violation() {
  let s = store().await;
  let dir = tempfile::tempdir().unwrap();
  let path = bulk_file(&dir, "land.bulk", &[row(&["1", "NL", "Nederland"]), row(&["2", "NL", "Nogmaals"])]);

  let err = s.bulk_load(&LAND, path, ExtractFormat::bulk()).await.unwrap_err();
  assert!(matches!(err, Error::Database(_)), "{err:?}");
  assert_eq!(s.row_count(&LAND).await.unwrap(), 0);
}

#[tokio::test]
async fn bulk_load_staged_extract_skips_header() {
  let s = store().await;
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join(LAND.extract_file_name());
  let mut w = ExtractWriter::new(std::fs::File::create(&path).unwrap(), ExtractFormat::staged());
  w.write_header(&LAND.column_names()).unwrap();
  w.write_row(&row(&["-1", "_?_", "_?_"])).unwrap();
  w.write_row(&row(&["1", "NL", "Nederland"])).unwrap();
  w.finish().unwrap();

  assert_eq!(s.bulk_load(&LAND, path, ExtractFormat::staged()).await.unwrap(), 2);
}

#[tokio::test]
async fn bulk_load_missing_file() {
  let s = store().await;
  let err = s
    .bulk_load(&LAND, PathBuf::from("/nonexistent/land.bulk"), ExtractFormat::bulk())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Extract { .. }));
}

#[tokio::test]
async fn successive_bulk_loads_append() {
  let s = store().await;
  let dir = tempfile::tempdir().unwrap();
  let first = bulk_file(&dir, "land-1.bulk", &[row(&["1", "NL", "Nederland"])]);
  let second = bulk_file(&dir, "land-2.bulk", &[row(&["2", "BE", "België"]), row(&["3", "DE", "Duitsland"])]);

  assert_eq!(s.bulk_load(&LAND, first, ExtractFormat::bulk()).await.unwrap(), 1);
  assert_eq!(s.bulk_load(&LAND, second, ExtractFormat::bulk()).await.unwrap(), 2);
  assert_eq!(s.row_count(&LAND).await.unwrap(), 3);
}
