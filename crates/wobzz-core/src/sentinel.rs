//! Reserved surrogate keys, sentinel dates and placeholder text.
//!
//! Every dimension that supports them uses the same four negative keys. The
//! calendar dimension additionally pairs each key with an out-of-band date in
//! the year 1000, so date parsers and the calendar generator must agree on
//! these values.

use serde::{Deserialize, Serialize};

/// A system-generated dimension key. Positive keys are assigned sequentially;
/// negative keys are reserved for [`Sentinel`] rows.
pub type SurrogateKey = i64;

/// Placeholder written for unknown or missing text attributes.
pub const PLACEHOLDER: &str = "_?_";

/// Placeholder used by two-character code columns (zorgtype).
pub const SHORT_PLACEHOLDER: &str = "??";

/// Default for blank hoofdgroep/subgroep codes.
pub const NULL_CODE: &str = "0000";

/// Date substituted by the date parser when a value is missing or invalid.
pub const UNKNOWN_DATE: &str = "1000-01-01";

/// Full datetime form of [`UNKNOWN_DATE`], used in staged extracts.
pub const UNKNOWN_DATETIME: &str = "1000-01-01 00:00:00";

/// Datetime substituted for unparsable effective dates (an open end date).
pub const OPEN_DATETIME: &str = "1000-04-04 00:00:00";

/// The reserved rows shared by all dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentinel {
  /// The value was missing or could not be resolved.
  Unknown,
  /// The attribute does not apply to this record.
  NotApplicable,
  /// The value was present but outside its domain.
  Invalid,
  /// The value is still pending (e.g. an open end date).
  Open,
}

impl Sentinel {
  pub const ALL: [Sentinel; 4] = [
    Sentinel::Unknown,
    Sentinel::NotApplicable,
    Sentinel::Invalid,
    Sentinel::Open,
  ];

  /// The reserved surrogate key, -1 through -4.
  pub const fn key(self) -> SurrogateKey { -(self.ordinal() as SurrogateKey) }

  /// 1 for unknown through 4 for open.
  pub const fn ordinal(self) -> u32 {
    match self {
      Sentinel::Unknown => 1,
      Sentinel::NotApplicable => 2,
      Sentinel::Invalid => 3,
      Sentinel::Open => 4,
    }
  }

  /// The calendar date standing in for this sentinel.
  pub const fn date(self) -> &'static str {
    match self {
      Sentinel::Unknown => UNKNOWN_DATE,
      Sentinel::NotApplicable => "1000-02-02",
      Sentinel::Invalid => "1000-03-03",
      Sentinel::Open => "1000-04-04",
    }
  }

  pub fn from_key(key: SurrogateKey) -> Option<Self> {
    Self::ALL.into_iter().find(|s| s.key() == key)
  }

  /// True if `key` can only have been produced by a sentinel row.
  pub fn is_reserved(key: SurrogateKey) -> bool { key <= 0 }
}
