//! The generated calendar dimension, `DIM.DAG`.

use chrono::{Datelike, NaiveDate};
use wobzz_core::{Row, sentinel::Sentinel};

use crate::{Error, Result};

fn row(id: i64, date: &str, year: i32, quarter: u32, month: u32, week: u32) -> Row {
  [
    id.to_string(),
    format!("{date} 00:00:00"),
    year.to_string(),
    quarter.to_string(),
    month.to_string(),
    week.to_string(),
    format!("{year:04}-{month:02}"),
    format!("{year:04}-{week:02}"),
  ]
  .into_iter()
  .map(Some)
  .collect()
}

/// The four reserved rows: key `-n` for sentinel `n`, dated `1000-0n-0n`,
/// with week, month and quarter all `n`. The unknown row's `dag_jaar_maand`
/// is `1000-12`.
pub fn sentinel_rows() -> Vec<Row> {
  Sentinel::ALL
    .iter()
    .map(|s| {
      let n = s.ordinal();
      let mut row = row(s.key(), s.date(), 1000, n, n, n);
      if *s == Sentinel::Unknown {
        row[6] = Some("1000-12".to_owned());
      }
      row
    })
    .collect()
}

/// Sentinel rows followed by one row per day in `start..=end`, keyed from 1.
/// Weeks are ISO weeks; `dag_jaar_week` pairs the ISO week with the
/// calendar year.
pub fn generate(start: NaiveDate, end: NaiveDate) -> Result<Vec<Row>> {
  if end < start {
    return Err(Error::CalendarRange { start, end });
  }
  let mut rows = sentinel_rows();
  for (id, day) in start.iter_days().take_while(|d| *d <= end).enumerate() {
    rows.push(row(
      id as i64 + 1,
      &day.format("%Y-%m-%d").to_string(),
      day.year(),
      day.month0() / 3 + 1,
      day.month(),
      day.iso_week().week(),
    ));
  }
  tracing::info!(%start, %end, rows = rows.len(), "generated calendar");
  Ok(rows)
}
