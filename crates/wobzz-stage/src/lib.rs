//! Staging transforms for the WOB ZZ warehouse.
//!
//! Each [`Dataset`] turns one or more raw reference files into the complete
//! row set of a dimension table (surrogate keys `1..=n` plus the reserved
//! unknown row) and writes it as a staged extract, `DIM.<NAME>.csv`, ready to
//! be bulk loaded. Pure synchronous; no database access.

pub mod calendar;
pub mod error;
pub mod frame;
mod normalize;
pub mod tarieven;
pub mod typeringslijst;
pub mod vektis;
pub mod zorgproduct;

use std::{
  fmt,
  path::{Path, PathBuf},
  str::FromStr,
};

use chrono::NaiveDate;
use encoding_rs::Encoding;
pub use error::{Error, Result};
pub use frame::Frame;
use wobzz_core::{
  Row,
  extract::ExtractFormat,
  schema::{
    BEHANDELING, DAG, DECLARATIE, DIAGNOSE, LAND, TableDef, ZORGPRODUCT, ZORGTYPE,
    ZORGVERLENERSOORT, ZORGVRAAG,
  },
};

// ─── Datasets ────────────────────────────────────────────────────────────────

/// A staged dimension and the transform producing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
  Behandeling,
  Diagnose,
  Zorgtype,
  Zorgvraag,
  Zorgproduct,
  Declaratie,
  Zorgverlenersoort,
  Land,
  Dag,
}

impl Dataset {
  pub const ALL: [Dataset; 9] = [
    Dataset::Dag,
    Dataset::Behandeling,
    Dataset::Diagnose,
    Dataset::Zorgtype,
    Dataset::Zorgvraag,
    Dataset::Zorgproduct,
    Dataset::Declaratie,
    Dataset::Zorgverlenersoort,
    Dataset::Land,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Dataset::Behandeling => "behandeling",
      Dataset::Diagnose => "diagnose",
      Dataset::Zorgtype => "zorgtype",
      Dataset::Zorgvraag => "zorgvraag",
      Dataset::Zorgproduct => "zorgproduct",
      Dataset::Declaratie => "declaratie",
      Dataset::Zorgverlenersoort => "zorgverlenersoort",
      Dataset::Land => "land",
      Dataset::Dag => "dag",
    }
  }

  pub fn table(self) -> &'static TableDef {
    match self {
      Dataset::Behandeling => &BEHANDELING,
      Dataset::Diagnose => &DIAGNOSE,
      Dataset::Zorgtype => &ZORGTYPE,
      Dataset::Zorgvraag => &ZORGVRAAG,
      Dataset::Zorgproduct => &ZORGPRODUCT,
      Dataset::Declaratie => &DECLARATIE,
      Dataset::Zorgverlenersoort => &ZORGVERLENERSOORT,
      Dataset::Land => &LAND,
      Dataset::Dag => &DAG,
    }
  }

  /// Layout of the staged extract. Country names are written without the
  /// null placeholder.
  pub fn format(self) -> ExtractFormat {
    match self {
      Dataset::Land => ExtractFormat::staged().with_null_text(""),
      _ => ExtractFormat::staged(),
    }
  }
}

impl fmt::Display for Dataset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Dataset {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Dataset::ALL
      .into_iter()
      .find(|d| d.name().eq_ignore_ascii_case(s))
      .ok_or_else(|| Error::UnknownDataset(s.to_owned()))
  }
}

// ─── Stager ──────────────────────────────────────────────────────────────────

/// Full paths of the raw reference files.
#[derive(Debug, Clone)]
pub struct ReferenceFiles {
  pub typeringslijst:            PathBuf,
  pub diagnose_zorgproductgroep: PathBuf,
  pub zorgproductgroepen:        PathBuf,
  pub zorgproducten:             PathBuf,
  pub wbmv:                      PathBuf,
  pub tarieven:                  PathBuf,
  pub zorgverlenersoort:         PathBuf,
  pub land:                      PathBuf,
}

/// Runs transforms and writes their extracts into `staging_dir`.
#[derive(Debug, Clone)]
pub struct Stager {
  pub files:          ReferenceFiles,
  /// Encoding of the reference files.
  pub encoding:       &'static Encoding,
  pub calendar_start: NaiveDate,
  pub calendar_end:   NaiveDate,
  pub staging_dir:    PathBuf,
}

/// A written staged extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedExtract {
  pub dataset: Dataset,
  pub path:    PathBuf,
  /// Rows written, the unknown row included.
  pub rows:    usize,
}

impl Stager {
  fn read(&self, path: &Path) -> Result<Frame> { Frame::read_path(path, self.encoding) }

  /// Produce the rows of `dataset` in destination column order.
  pub fn rows(&self, dataset: Dataset) -> Result<Vec<Row>> {
    use typeringslijst::{BEHANDELING_AXIS, ZORGTYPE_AXIS, ZORGVRAAG_AXIS, stage_axis};

    let files = &self.files;
    match dataset {
      Dataset::Behandeling => stage_axis(&self.read(&files.typeringslijst)?, &BEHANDELING_AXIS),
      Dataset::Zorgtype => stage_axis(&self.read(&files.typeringslijst)?, &ZORGTYPE_AXIS),
      Dataset::Zorgvraag => stage_axis(&self.read(&files.typeringslijst)?, &ZORGVRAAG_AXIS),
      Dataset::Diagnose => typeringslijst::stage_diagnose(
        &self.read(&files.typeringslijst)?,
        &self.read(&files.diagnose_zorgproductgroep)?,
        &self.read(&files.zorgproductgroepen)?,
      ),
      Dataset::Zorgproduct => zorgproduct::stage(
        &self.read(&files.zorgproducten)?,
        &self.read(&files.zorgproductgroepen)?,
        &self.read(&files.wbmv)?,
      ),
      Dataset::Declaratie => tarieven::stage(&self.read(&files.tarieven)?),
      Dataset::Zorgverlenersoort => {
        vektis::stage_zorgverlenersoort(&self.read(&files.zorgverlenersoort)?)
      }
      Dataset::Land => vektis::stage_land(&self.read(&files.land)?),
      Dataset::Dag => calendar::generate(self.calendar_start, self.calendar_end),
    }
  }

  /// Stage `dataset` and write its extract.
  pub fn stage(&self, dataset: Dataset) -> Result<StagedExtract> {
    let rows = self.rows(dataset)?;
    let path = frame::write_extract(&self.staging_dir, dataset.table(), &rows, dataset.format())?;
    tracing::info!(%dataset, path = %path.display(), rows = rows.len(), "wrote staged extract");
    Ok(StagedExtract { dataset, path, rows: rows.len() })
  }
}

#[cfg(test)]
mod tests {
  use wobzz_core::extract::read_extract;

  use super::*;

  fn stager(dir: &Path) -> Stager {
    let missing = dir.join("missing.csv");
    Stager {
      files:          ReferenceFiles {
        typeringslijst:            dir.join("typeringslijst.csv"),
        diagnose_zorgproductgroep: missing.clone(),
        zorgproductgroepen:        missing.clone(),
        zorgproducten:             missing.clone(),
        wbmv:                      missing.clone(),
        tarieven:                  missing.clone(),
        zorgverlenersoort:         missing.clone(),
        land:                      missing,
      },
      encoding:       encoding_rs::WINDOWS_1252,
      calendar_start: NaiveDate::from_ymd_opt(2012, 1, 1).unwrap(),
      calendar_end:   NaiveDate::from_ymd_opt(2012, 1, 31).unwrap(),
      staging_dir:    dir.to_owned(),
    }
  }

  #[test]
  fn dataset_names_round_trip() {
    for dataset in Dataset::ALL {
      assert_eq!(dataset.name().parse::<Dataset>().unwrap(), dataset);
    }
    assert!("nope".parse::<Dataset>().is_err());
    assert_eq!("LAND".parse::<Dataset>().unwrap(), Dataset::Land);
  }

  #[test]
  fn three_rows_sharing_a_key_stage_as_two_plus_unknown() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join("typeringslijst.csv"),
      b"Specialisme code AGB;As omschrijving;Component Code;Component omschrijving lang;\
Hoofdgroep code;Hoofdgroep omschrijving lang;Subgroep code;Subgroep omschrijving lang;\
Ingangsdatum;Afloopdatum\r\n\
0303;behandeling;1;Eerste;;;;;20050101;20111231\r\n\
0303;behandeling;2;Tweede;;;;;20050101;\r\n\
0303;behandeling;1;Operati\xeb;;;;;20120101;\r\n",
    )
    .unwrap();

    let staged = stager(dir.path()).stage(Dataset::Behandeling).unwrap();
    assert_eq!(staged.rows, 3);
    assert!(staged.path.ends_with("DIM.BEHANDELING.csv"));

    let bytes = std::fs::read(&staged.path).unwrap();
    assert!(bytes.starts_with(b"beh_id;beh_dbc_specialisme_code;beh_dbc_behandeling_code;"));
    let rows = read_extract(bytes.as_slice(), ExtractFormat::staged()).unwrap();
    let keys: Vec<_> = rows.iter().map(|r| r[0].clone().unwrap()).collect();
    assert_eq!(keys, ["-1", "1", "2"]);
    assert_eq!(rows[1][2].as_deref(), Some("0002"));
    assert_eq!(rows[2][2].as_deref(), Some("0001"));
    assert_eq!(rows[2][3].as_deref(), Some("Operatië"));
    assert_eq!(rows[2][9].as_deref(), Some("1000-04-04 00:00:00"));
  }

  #[test]
  fn calendar_is_staged_without_source_files() {
    let dir = tempfile::tempdir().unwrap();
    let staged = stager(dir.path()).stage(Dataset::Dag).unwrap();
    assert_eq!(staged.rows, 4 + 31);
  }

  #[test]
  fn missing_source_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = stager(dir.path()).stage(Dataset::Land).unwrap_err();
    assert!(matches!(err, Error::Read { ref path, .. } if path.ends_with("missing.csv")));
  }
}
