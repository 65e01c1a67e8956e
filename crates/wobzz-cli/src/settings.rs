//! Run settings, deserialised from `wobzz.toml` and `WOBZZ_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail, ensure};
use chrono::NaiveDate;
use serde::Deserialize;
use wobzz_load::DEFAULT_BULK_SIZE;
use wobzz_stage::ReferenceFiles;

// ─── Sections ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct EtlConfig {
  /// SQLite warehouse file.
  pub store_path:     PathBuf,
  /// Staged extracts and bulk buffer files.
  pub staging_path:   PathBuf,
  /// Root of the transaction files.
  pub data_path:      PathBuf,
  /// Root of the DBC Onderhoud reference files.
  pub dbco_path:      PathBuf,
  /// Root of the Vektis code lists.
  pub vektis_path:    PathBuf,
  #[serde(default = "default_encoding")]
  pub input_encoding: String,
  #[serde(default)]
  pub calendar:       CalendarConfig,
  #[serde(default)]
  pub reference:      ReferenceConfig,
  #[serde(default)]
  pub facts:          FactsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

/// Reference file names. DBC files are relative to `dbco_path`, Vektis
/// files to `vektis_path`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
  pub typeringslijst:            String,
  pub diagnose_zorgproductgroep: String,
  pub zorgproductgroepen:        String,
  pub zorgproducten:             String,
  pub wbmv:                      String,
  pub tarieven:                  String,
  pub zorgverlenersoort:         String,
  pub land:                      String,
}

/// The monthly transaction files, `first_period..=last_period` as `YYYYMM`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FactsConfig {
  pub first_period: u32,
  pub last_period:  u32,
  /// Path below `data_path`; `{year}` and `{period}` are substituted.
  pub file_pattern: String,
  /// Rows per bulk load of facts and subtraject numbers.
  pub bulk_size:    usize,
}

fn default_encoding() -> String { "windows-1252".to_owned() }

impl Default for CalendarConfig {
  fn default() -> Self {
    Self {
      start: NaiveDate::from_ymd_opt(2007, 1, 1).unwrap_or_default(),
      end:   NaiveDate::from_ymd_opt(2020, 12, 31).unwrap_or_default(),
    }
  }
}

const TOTAALBESTAND: &str = "20140601 Totaalbestand uitlevering v20140501";

impl Default for ReferenceConfig {
  fn default() -> Self {
    let dbc = |name: &str| format!("{TOTAALBESTAND}/{name}");
    Self {
      typeringslijst:            dbc("20140101 Elektronische Typeringslijst v20131114.csv"),
      diagnose_zorgproductgroep: dbc("20140101 Relatie Diagnose Zorgproductgroepen Tabel v20130926.csv"),
      zorgproductgroepen:        dbc("20140101 Zorgproductgroepen Tabel v20131114.csv"),
      zorgproducten:             dbc("20140601 Zorgproducten Tabel v20140501.csv"),
      wbmv:                      dbc("20140101 WBMV Code Tabel v20131114.csv"),
      tarieven:                  dbc("20140601 Tarieven Tabel 20140501.csv"),
      zorgverlenersoort:         "COD016_-_VEKT.csv".to_owned(),
      land:                      "COD032_-_NEN.csv".to_owned(),
    }
  }
}

impl Default for FactsConfig {
  fn default() -> Self {
    Self {
      first_period: 201201,
      last_period:  201412,
      file_pattern: "{year}/DIS_RAP_SZG_WOB_STR_700_{period}_20140410_1.csv.bz2".to_owned(),
      bulk_size:    DEFAULT_BULK_SIZE,
    }
  }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

impl EtlConfig {
  /// Read `path` (optional) layered under `WOBZZ_*` variables; nested keys
  /// use `__`, as in `WOBZZ_CALENDAR__START`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("WOBZZ")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?;

    let mut cfg: EtlConfig = settings
      .try_deserialize()
      .context("failed to deserialise EtlConfig")?;
    for path in [
      &mut cfg.store_path,
      &mut cfg.staging_path,
      &mut cfg.data_path,
      &mut cfg.dbco_path,
      &mut cfg.vektis_path,
    ] {
      *path = expand_tilde(path);
    }
    Ok(cfg)
  }

  pub fn reference_files(&self) -> ReferenceFiles {
    let dbco = |name: &str| self.dbco_path.join(name);
    let r = &self.reference;
    ReferenceFiles {
      typeringslijst:            dbco(&r.typeringslijst),
      diagnose_zorgproductgroep: dbco(&r.diagnose_zorgproductgroep),
      zorgproductgroepen:        dbco(&r.zorgproductgroepen),
      zorgproducten:             dbco(&r.zorgproducten),
      wbmv:                      dbco(&r.wbmv),
      tarieven:                  dbco(&r.tarieven),
      zorgverlenersoort:         self.vektis_path.join(&r.zorgverlenersoort),
      land:                      self.vektis_path.join(&r.land),
    }
  }

  /// Every monthly transaction file, in period order.
  pub fn fact_files(&self) -> anyhow::Result<Vec<PathBuf>> {
    let FactsConfig { first_period, last_period, file_pattern, .. } = &self.facts;
    let (mut year, mut month) = split_period(*first_period)?;
    let last = split_period(*last_period)?;
    ensure!(
      (year, month) <= last,
      "facts.first_period {first_period} is after facts.last_period {last_period}"
    );

    let mut files = Vec::new();
    while (year, month) <= last {
      let name = file_pattern
        .replace("{year}", &year.to_string())
        .replace("{period}", &format!("{year:04}{month:02}"));
      files.push(self.data_path.join(name));
      (year, month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    }
    Ok(files)
  }
}

fn split_period(period: u32) -> anyhow::Result<(u32, u32)> {
  let (year, month) = (period / 100, period % 100);
  if !(1..=12).contains(&month) || year < 1000 {
    bail!("invalid period {period}: expected YYYYMM");
  }
  Ok((year, month))
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
