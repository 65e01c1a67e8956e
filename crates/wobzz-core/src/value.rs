//! Field-level parsers for raw WOB ZZ values.
//!
//! Every function here is total: malformed input degrades to a documented
//! default instead of producing an error, so a bad field never aborts the
//! record it belongs to.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::sentinel::UNKNOWN_DATE;

/// Input shapes accepted for reference-table effective dates.
const DATE_FORMATS: &[&str] = &["%Y%m%d", "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Parse a `J`/`N` flag (case-insensitive) into `1`/`0`.
///
/// Anything else, including an empty or absent value, is `None` rather than
/// false.
pub fn parse_boolean(value: Option<&str>) -> Option<u8> {
  match value {
    Some(v) if v.eq_ignore_ascii_case("J") => Some(1),
    Some(v) if v.eq_ignore_ascii_case("N") => Some(0),
    _ => None,
  }
}

/// Normalise a code: upper-case and left-pad with zeros to `width`.
///
/// Empty, absent and `"0"` values become `default`.
pub fn parse_code(value: Option<&str>, width: usize, default: &str) -> String {
  match value {
    None | Some("") | Some("0") => default.to_owned(),
    Some(v) => zero_pad(&v.to_uppercase(), width),
  }
}

/// Reformat a `YYYYMMDD` date as `YYYY-MM-DD`.
///
/// Missing or unparsable input yields [`UNKNOWN_DATE`].
pub fn parse_date(value: Option<&str>) -> String {
  value
    .and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y%m%d").ok())
    .map(|d| d.format("%Y-%m-%d").to_string())
    .unwrap_or_else(|| UNKNOWN_DATE.to_owned())
}

/// Zero-pad a code to width 4, or return `default` for a null/blank value.
pub fn parse_null(value: Option<&str>, default: &str) -> String {
  match value {
    Some(v) if !v.trim().is_empty() => zero_pad(v, 4),
    _ => default.to_owned(),
  }
}

/// Convert an amount in cents to an exact decimal amount.
///
/// Unparsable input yields zero.
pub fn parse_money(value: Option<&str>) -> Decimal {
  let Some(v) = value.map(str::trim) else {
    return Decimal::ZERO;
  };
  if let Ok(cents) = v.parse::<i64>() {
    return Decimal::new(cents, 2);
  }
  v.parse::<Decimal>()
    .ok()
    .and_then(|d| d.checked_div(Decimal::ONE_HUNDRED))
    .unwrap_or(Decimal::ZERO)
}

/// Parse an integer, falling back to `default`.
pub fn parse_int(value: Option<&str>, default: i64) -> i64 {
  value
    .and_then(|v| v.trim().parse().ok())
    .unwrap_or(default)
}

/// Render a date as the destination's full datetime string
/// (`YYYY-MM-DD 00:00:00`), or `default` when it cannot be parsed.
pub fn to_target_datetime(value: Option<&str>, default: &str) -> String {
  value
    .and_then(parse_flexible_date)
    .map(|d| d.format("%Y-%m-%d 00:00:00").to_string())
    .unwrap_or_else(|| default.to_owned())
}

/// Parse a date in any of the shapes found in the reference tables. A trailing
/// time part (`2014-01-01 00:00:00`, `2014-01-01T00:00`) is ignored.
pub fn parse_flexible_date(value: &str) -> Option<NaiveDate> {
  let date_part = value
    .trim()
    .split([' ', 'T'])
    .next()
    .filter(|s| !s.is_empty())?;
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Left-pad `value` with `'0'` to `width` characters. Longer values are
/// returned unchanged.
pub fn zero_pad(value: &str, width: usize) -> String {
  let len = value.chars().count();
  if len >= width {
    return value.to_owned();
  }
  let mut out = String::with_capacity(width);
  out.extend(std::iter::repeat_n('0', width - len));
  out.push_str(value);
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sentinel::{OPEN_DATETIME, PLACEHOLDER, UNKNOWN_DATETIME};

  #[test]
  fn boolean_flags() {
    assert_eq!(parse_boolean(Some("J")), Some(1));
    assert_eq!(parse_boolean(Some("j")), Some(1));
    assert_eq!(parse_boolean(Some("n")), Some(0));
    assert_eq!(parse_boolean(Some("")), None);
    assert_eq!(parse_boolean(Some("X")), None);
    assert_eq!(parse_boolean(None), None);
  }

  #[test]
  fn codes_are_padded_and_defaulted() {
    assert_eq!(parse_code(Some(""), 4, PLACEHOLDER), PLACEHOLDER);
    assert_eq!(parse_code(Some("0"), 4, PLACEHOLDER), PLACEHOLDER);
    assert_eq!(parse_code(None, 2, "??"), "??");
    assert_eq!(parse_code(Some("12"), 4, PLACEHOLDER), "0012");
    assert_eq!(parse_code(Some("a1"), 4, PLACEHOLDER), "00A1");
    assert_eq!(parse_code(Some("990356052"), 9, PLACEHOLDER), "990356052");
    assert_eq!(parse_code(Some("12345"), 4, PLACEHOLDER), "12345");
  }

  #[test]
  fn dates_are_reformatted() {
    assert_eq!(parse_date(Some("20120105")), "2012-01-05");
    assert_eq!(parse_date(None), "1000-01-01");
    assert_eq!(parse_date(Some("")), "1000-01-01");
    assert_eq!(parse_date(Some("20121345")), "1000-01-01");
    assert_eq!(parse_date(Some("garbage")), "1000-01-01");
  }

  #[test]
  fn nulls_become_default() {
    assert_eq!(parse_null(None, "0000"), "0000");
    assert_eq!(parse_null(Some("  "), "0000"), "0000");
    assert_eq!(parse_null(Some("7"), "0000"), "0007");
  }

  #[test]
  fn money_is_exact() {
    assert_eq!(parse_money(Some("150")), Decimal::new(150, 2));
    assert_eq!(parse_money(Some("150")).to_string(), "1.50");
    assert_eq!(parse_money(Some("-2599")).to_string(), "-25.99");
    assert_eq!(parse_money(Some("12.5")), Decimal::new(125, 3));
    assert_eq!(parse_money(Some("abc")), Decimal::ZERO);
    assert_eq!(parse_money(None), Decimal::ZERO);
  }

  #[test]
  fn ints_fall_back() {
    assert_eq!(parse_int(Some("2"), 0), 2);
    assert_eq!(parse_int(Some(""), 0), 0);
    assert_eq!(parse_int(Some("M"), 0), 0);
  }

  #[test]
  fn target_datetime_accepts_reference_shapes() {
    assert_eq!(to_target_datetime(Some("20140101"), OPEN_DATETIME), "2014-01-01 00:00:00");
    assert_eq!(to_target_datetime(Some("01-06-2014"), OPEN_DATETIME), "2014-06-01 00:00:00");
    assert_eq!(
      to_target_datetime(Some("2014-06-01 00:00:00"), OPEN_DATETIME),
      "2014-06-01 00:00:00",
    );
    assert_eq!(to_target_datetime(Some("31/12/2014"), OPEN_DATETIME), "2014-12-31 00:00:00");
  }

  #[test]
  fn target_datetime_defaults() {
    assert_eq!(to_target_datetime(None, OPEN_DATETIME), OPEN_DATETIME);
    assert_eq!(to_target_datetime(Some(""), OPEN_DATETIME), OPEN_DATETIME);
    assert_eq!(to_target_datetime(Some("soon"), UNKNOWN_DATETIME), UNKNOWN_DATETIME);
  }
}
