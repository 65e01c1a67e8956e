//! Dimensions staged from the Elektronische Typeringslijst: one source file
//! holding the behandeling, diagnose, zorgtype and zorgvraag axes, told apart
//! by the `As omschrijving` column.
//!
//! The file lists every historic version of a code; only the last listed
//! version of each (specialism, code) pair is kept.

use wobzz_core::{
  Row,
  schema::{BEHANDELING, DIAGNOSE, TableDef, ZORGTYPE, ZORGVRAAG},
  sentinel::{OPEN_DATETIME, SHORT_PLACEHOLDER},
};

use crate::{
  Result,
  frame::Frame,
  normalize::{datetime, null_code, pad, unknown_row},
};

const AXIS_COLUMN: &str = "As omschrijving";

/// Source columns, in the order of the destination columns after the key.
/// The four destination tables share this layout.
const SOURCE_COLUMNS: [&str; 9] = [
  "Specialisme code AGB",
  "Component Code",
  "Component omschrijving lang",
  "Hoofdgroep code",
  "Hoofdgroep omschrijving lang",
  "Subgroep code",
  "Subgroep omschrijving lang",
  "Ingangsdatum",
  "Afloopdatum",
];

/// How one axis of the list is normalised.
#[derive(Debug, Clone, Copy)]
pub struct Axis {
  /// Value of the axis column selecting this axis.
  pub name:           &'static str,
  pub table:          &'static TableDef,
  code_width:         usize,
  /// Code written in the unknown row.
  unknown_code:       Option<&'static str>,
  /// Absent group codes become `0000`; otherwise group codes are
  /// zero-padded and absent ones stay null.
  null_hoofdgroep:    bool,
  null_subgroep:      bool,
}

pub static BEHANDELING_AXIS: Axis = Axis {
  name:               "behandeling",
  table:              &BEHANDELING,
  code_width:         4,
  unknown_code:       None,
  null_hoofdgroep:    true,
  null_subgroep:      false,
};

pub static DIAGNOSE_AXIS: Axis = Axis {
  name:               "diagnose",
  table:              &DIAGNOSE,
  code_width:         4,
  unknown_code:       None,
  null_hoofdgroep:    true,
  null_subgroep:      true,
};

pub static ZORGTYPE_AXIS: Axis = Axis {
  name:               "zorgtype",
  table:              &ZORGTYPE,
  code_width:         2,
  unknown_code:       Some(SHORT_PLACEHOLDER),
  null_hoofdgroep:    false,
  null_subgroep:      false,
};

pub static ZORGVRAAG_AXIS: Axis = Axis {
  name:               "zorgvraag",
  table:              &ZORGVRAAG,
  code_width:         4,
  unknown_code:       Some(SHORT_PLACEHOLDER),
  null_hoofdgroep:    false,
  null_subgroep:      false,
};

impl Axis {
  fn column(&self, position: usize) -> &'static str { self.table.columns[position].name }

  fn specialism(&self) -> &'static str { self.column(1) }

  fn code(&self) -> &'static str { self.column(2) }

  fn unknown_row(&self) -> Row {
    match self.unknown_code {
      Some(code) => unknown_row(self.table, &[(self.code(), code)]),
      None => unknown_row(self.table, &[]),
    }
  }

  /// Filter, rename, normalise and deduplicate this axis of `source`.
  fn extract(&self, source: &Frame) -> Result<Frame> {
    let mapping: Vec<(&str, &str)> = SOURCE_COLUMNS
      .iter()
      .zip(&self.table.columns[1..])
      .map(|(from, to)| (*from, to.name))
      .collect();

    let mut frame = source
      .clone()
      .filter_eq(AXIS_COLUMN, self.name)?
      .select(&mapping)?;
    frame.map_column(self.specialism(), pad(4))?;
    frame.map_column(self.code(), pad(self.code_width))?;
    if self.null_hoofdgroep {
      frame.map_column(self.column(4), null_code)?;
    } else {
      frame.map_column(self.column(4), pad(4))?;
    }
    if self.null_subgroep {
      frame.map_column(self.column(6), null_code)?;
    }
    frame.map_column(self.column(8), datetime(OPEN_DATETIME))?;
    frame.map_column(self.column(9), datetime(OPEN_DATETIME))?;
    frame.drop_duplicates_keep_last(&[self.specialism(), self.code()])
  }
}

/// Stage a plain axis (behandeling, zorgtype, zorgvraag).
pub fn stage_axis(source: &Frame, axis: &Axis) -> Result<Vec<Row>> {
  let frame = axis.extract(source)?;
  tracing::info!(axis = axis.name, rows = frame.len(), "staged typeringslijst axis");
  Ok(frame.into_table(axis.table, axis.unknown_row()))
}

/// Stage diagnoses, enriched with their care-product group from the
/// diagnosis relation table and its description from the group table.
/// Diagnoses without a group are dropped.
pub fn stage_diagnose(source: &Frame, relation: &Frame, groups: &Frame) -> Result<Vec<Row>> {
  let axis = DIAGNOSE_AXIS;
  let diagnoses = axis.extract(source)?;

  let mut relation = relation.clone().select(&[
    ("Specialisme code AGB", "dia_dbc_specialisme_code"),
    ("Diagnose code", "dia_dbc_diagnose_code"),
    ("Zorgproductgroep code", "dia_dbc_zorgproductgroep_code"),
  ])?;
  relation.map_column("dia_dbc_specialisme_code", pad(4))?;
  relation.map_column("dia_dbc_diagnose_code", pad(4))?;
  let relation =
    relation.drop_duplicates_keep_last(&["dia_dbc_specialisme_code", "dia_dbc_diagnose_code"])?;

  let groups = groups
    .clone()
    .select(&[
      ("Zorgproductgroep code", "dia_dbc_zorgproductgroep_code"),
      ("Zorgproductgroep omschrijving", "dia_dbc_zorgproductgroep_omschrijving"),
    ])?
    .drop_duplicates_keep_last(&["dia_dbc_zorgproductgroep_code"])?;

  let frame = diagnoses
    .inner_join(&relation, &["dia_dbc_specialisme_code", "dia_dbc_diagnose_code"])?
    .inner_join(&groups, &["dia_dbc_zorgproductgroep_code"])?;
  tracing::info!(axis = axis.name, rows = frame.len(), "staged typeringslijst axis");
  Ok(frame.into_table(axis.table, axis.unknown_row()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cells(values: &[&str]) -> Row {
    values.iter().map(|v| (!v.is_empty()).then(|| v.to_string())).collect()
  }

  fn typeringslijst(rows: &[[&str; 10]]) -> Frame {
    let mut columns = vec![AXIS_COLUMN];
    columns.extend(SOURCE_COLUMNS);
    Frame::new(&columns, rows.iter().map(|r| cells(r)).collect())
  }

  #[test]
  fn duplicate_codes_keep_the_last_version() {
    let source = typeringslijst(&[
      ["zorgtype", "303", "1", "oud", "", "", "", "", "20050101", "20111231"],
      ["zorgtype", "303", "2", "ander", "", "", "", "", "20050101", ""],
      ["zorgtype", "0303", "01", "nieuw", "", "", "", "", "20120101", ""],
      ["zorgvraag", "303", "1", "elders", "", "", "", "", "", ""],
    ]);
    let rows = stage_axis(&source, &ZORGTYPE_AXIS).unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0].as_deref(), Some("-1"));
    assert_eq!(rows[0][2].as_deref(), Some("??"));
    // Destination order: id, specialism, code, description, ...
    assert_eq!(rows[1][..4], cells(&["1", "0303", "02", "ander"])[..]);
    assert_eq!(rows[2][..4], cells(&["2", "0303", "01", "nieuw"])[..]);
    assert_eq!(rows[2][4], None);
    assert_eq!(rows[2][8].as_deref(), Some("2012-01-01 00:00:00"));
    assert_eq!(rows[2][9].as_deref(), Some("1000-04-04 00:00:00"));
  }

  #[test]
  fn keys_are_sequential_and_sentinel_is_outside() {
    let source = typeringslijst(&[
      ["behandeling", "0303", "0001", "a", "", "", "", "", "", ""],
      ["behandeling", "0303", "0002", "b", "", "", "", "", "", ""],
      ["behandeling", "0303", "0001", "c", "", "", "", "", "", ""],
    ]);
    let rows = stage_axis(&source, &BEHANDELING_AXIS).unwrap();
    let keys: Vec<_> = rows.iter().map(|r| r[0].clone().unwrap()).collect();
    assert_eq!(keys, ["-1", "1", "2"]);
    assert_eq!(rows[2][3].as_deref(), Some("c"));
    assert_eq!(rows[0][1].as_deref(), Some("_?_"));
  }

  #[test]
  fn absent_hoofdgroep_is_0000_only_for_behandeling_and_diagnose() {
    let source = typeringslijst(&[
      ["behandeling", "0303", "0001", "a", "", "", "", "", "", ""],
      ["zorgtype", "0303", "11", "b", "", "", "", "", "", ""],
      ["zorgtype", "0303", "12", "c", "7", "", "", "", "", ""],
      ["zorgvraag", "0303", "0001", "d", "", "", "", "", "", ""],
    ]);

    let behandeling = stage_axis(&source, &BEHANDELING_AXIS).unwrap();
    assert_eq!(behandeling[1][4].as_deref(), Some("0000"));

    let zorgtype = stage_axis(&source, &ZORGTYPE_AXIS).unwrap();
    assert_eq!(zorgtype[1][4], None);
    assert_eq!(zorgtype[2][4].as_deref(), Some("0007"));

    let zorgvraag = stage_axis(&source, &ZORGVRAAG_AXIS).unwrap();
    assert_eq!(zorgvraag[1][4], None);
  }

  #[test]
  fn diagnoses_are_enriched_and_unmatched_dropped() {
    let source = typeringslijst(&[
      ["diagnose", "303", "11", "breuk", "", "", "", "", "", ""],
      ["diagnose", "303", "12", "zonder groep", "", "", "", "", "", ""],
    ]);
    let relation = Frame::new(
      &["Specialisme code AGB", "Diagnose code", "Zorgproductgroep code", "Ingangsdatum"],
      vec![cells(&["0303", "11", "0401", ""])],
    );
    let groups = Frame::new(
      &["Zorgproductgroep code", "Zorgproductgroep omschrijving"],
      vec![cells(&["0401", "oud"]), cells(&["0401", "Botbreuken"])],
    );

    let rows = stage_diagnose(&source, &relation, &groups).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][2].as_deref(), Some("0011"));
    assert_eq!(rows[1][10].as_deref(), Some("0401"));
    assert_eq!(rows[1][11].as_deref(), Some("Botbreuken"));
    assert_eq!(rows[1][6].as_deref(), Some("0000"));
  }
}
