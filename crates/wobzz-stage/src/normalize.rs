//! Cell normalisers for [`Frame::map_column`](crate::frame::Frame::map_column)
//! and the reserved unknown row every staged dimension carries.

use wobzz_core::{
  Row,
  schema::{ColumnType, TableDef},
  sentinel::{NULL_CODE, PLACEHOLDER, Sentinel, UNKNOWN_DATETIME},
  value::{parse_null, to_target_datetime, zero_pad},
};

/// Left-pad a present code to `width`; nulls stay null.
pub fn pad(width: usize) -> impl Fn(Option<&str>) -> Option<String> {
  move |cell| cell.map(|v| zero_pad(v.trim(), width))
}

/// Pad a group code to width 4, or [`NULL_CODE`] when absent.
pub fn null_code(cell: Option<&str>) -> Option<String> { Some(parse_null(cell, NULL_CODE)) }

/// Reference dates as full datetimes, `default` when missing or unparsable.
pub fn datetime(default: &'static str) -> impl Fn(Option<&str>) -> Option<String> {
  move |cell| Some(to_target_datetime(cell, default))
}

/// The `-1` row of `table`: text columns hold the placeholder, date columns
/// the unknown date, decimals zero. `overrides` replace individual columns.
pub fn unknown_row(table: &TableDef, overrides: &[(&str, &str)]) -> Row {
  table
    .columns
    .iter()
    .map(|column| {
      if let Some((_, value)) = overrides.iter().find(|(name, _)| *name == column.name) {
        return Some((*value).to_owned());
      }
      let value = match column.ty {
        _ if table.key == Some(column.name) => Sentinel::Unknown.key().to_string(),
        ColumnType::Text => PLACEHOLDER.to_owned(),
        ColumnType::Date => UNKNOWN_DATETIME.to_owned(),
        ColumnType::Decimal => "0.00".to_owned(),
        ColumnType::Integer | ColumnType::Bit => Sentinel::Unknown.key().to_string(),
      };
      Some(value)
    })
    .collect()
}
