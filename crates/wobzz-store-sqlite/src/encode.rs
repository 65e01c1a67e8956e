//! Conversion between extract text cells and SQLite values, driven by the
//! declared [`ColumnType`] of each destination column.
//!
//! Dates are stored as `YYYY-MM-DD` (any time part in the extract is
//! dropped), decimals as validated text, integers and bits as integers.

use rusqlite::types::Value;
use rust_decimal::Decimal;
use wobzz_core::{
  schema::{Column, ColumnType},
  value::parse_flexible_date,
};

/// Encode one cell for `column`; `Err` carries a human-readable reason.
pub fn encode_cell(column: &Column, cell: Option<String>) -> Result<Value, String> {
  let Some(text) = cell else {
    return Ok(Value::Null);
  };
  match column.ty {
    ColumnType::Text => Ok(Value::Text(text)),
    ColumnType::Integer => text
      .trim()
      .parse::<i64>()
      .map(Value::Integer)
      .map_err(|_| format!("{}: not an integer: {text:?}", column.name)),
    ColumnType::Bit => match text.trim() {
      "0" => Ok(Value::Integer(0)),
      "1" => Ok(Value::Integer(1)),
      _ => Err(format!("{}: not a bit: {text:?}", column.name)),
    },
    ColumnType::Date => parse_flexible_date(&text)
      .map(|d| Value::Text(d.format("%Y-%m-%d").to_string()))
      .ok_or_else(|| format!("{}: not a date: {text:?}", column.name)),
    ColumnType::Decimal => text
      .trim()
      .parse::<Decimal>()
      .map(|d| Value::Text(d.to_string()))
      .map_err(|_| format!("{}: not a decimal: {text:?}", column.name)),
  }
}

/// Decode a stored value back to extract text.
pub fn decode_value(value: Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::Integer(i) => Some(i.to_string()),
    Value::Real(r) => Some(r.to_string()),
    Value::Text(s) => Some(s),
    Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
  }
}
