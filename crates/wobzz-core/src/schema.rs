//! The destination table catalog.
//!
//! Column order here is the physical order of every staged and bulk extract,
//! so it is the single source of truth for staging transforms, DDL and bulk
//! loads alike. Tables live in two groups, `DIM` and `FCT`; `DIM.DAG` is the
//! qualified name, `DIM_DAG` the name inside the store.

use std::fmt;

// ─── Column types ────────────────────────────────────────────────────────────

/// Storage class of a destination column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
  Integer,
  Text,
  /// A calendar date stored as `YYYY-MM-DD`; a trailing time part in an
  /// extract is dropped on load.
  Date,
  /// `0`, `1` or null.
  Bit,
  /// An exact decimal, kept as its textual representation.
  Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
  pub name:     &'static str,
  pub ty:       ColumnType,
  pub not_null: bool,
  /// SQL literal used when an extract field is empty.
  pub default:  Option<&'static str>,
}

impl Column {
  const fn new(name: &'static str, ty: ColumnType) -> Self {
    Self { name, ty, not_null: false, default: None }
  }

  const fn not_null(mut self) -> Self {
    self.not_null = true;
    self
  }

  const fn default(mut self, literal: &'static str) -> Self {
    self.default = Some(literal);
    self
  }
}

const fn int(name: &'static str) -> Column { Column::new(name, ColumnType::Integer) }
const fn text(name: &'static str) -> Column { Column::new(name, ColumnType::Text) }
const fn date(name: &'static str) -> Column { Column::new(name, ColumnType::Date) }
const fn bit(name: &'static str) -> Column { Column::new(name, ColumnType::Bit) }
const fn decimal(name: &'static str) -> Column { Column::new(name, ColumnType::Decimal) }

// ─── Tables ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableGroup {
  Dim,
  Fct,
}

impl fmt::Display for TableGroup {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TableGroup::Dim => f.write_str("DIM"),
      TableGroup::Fct => f.write_str("FCT"),
    }
  }
}

#[derive(Debug)]
pub struct TableDef {
  pub group:       TableGroup,
  pub name:        &'static str,
  /// Surrogate primary key; `None` for fact tables.
  pub key:         Option<&'static str>,
  pub columns:     &'static [Column],
  /// Columns forming the unique natural key.
  pub natural_key: &'static [&'static str],
}

impl TableDef {
  /// `DIM.DAG`
  pub fn qualified_name(&self) -> String { format!("{}.{}", self.group, self.name) }

  /// `DIM_DAG`
  pub fn sql_name(&self) -> String { format!("{}_{}", self.group, self.name) }

  /// `DIM.DAG.csv`
  pub fn extract_file_name(&self) -> String { format!("{}.csv", self.qualified_name()) }

  /// `DIM.DAG.bulk`
  pub fn bulk_file_name(&self) -> String { format!("{}.bulk", self.qualified_name()) }

  pub fn column_names(&self) -> Vec<&'static str> {
    self.columns.iter().map(|c| c.name).collect()
  }

  pub fn column(&self, name: &str) -> Option<&'static Column> {
    self.columns.iter().find(|c| c.name == name)
  }

  pub fn position(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c.name == name)
  }
}

impl PartialEq for TableDef {
  fn eq(&self, other: &Self) -> bool { self.group == other.group && self.name == other.name }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

pub static AFSLUITREDEN: TableDef = TableDef {
  group:       TableGroup::Dim,
  name:        "AFSLUITREDEN",
  key:         Some("afs_id"),
  columns:     &[int("afs_id").not_null(), text("afs_afsluitreden_code").not_null()],
  natural_key: &["afs_afsluitreden_code"],
};

pub static BEHANDELING: TableDef = TableDef {
  group:       TableGroup::Dim,
  name:        "BEHANDELING",
  key:         Some("beh_id"),
  columns:     &[
    int("beh_id").not_null(),
    text("beh_dbc_specialisme_code").not_null(),
    text("beh_dbc_behandeling_code").not_null(),
    text("beh_dbc_behandeling_omschrijving"),
    text("beh_dbc_hoofdgroep_code"),
    text("beh_dbc_hoofdgroep_omschrijving"),
    text("beh_dbc_subgroep_code"),
    text("beh_dbc_subgroep_omschrijving"),
    date("beh_dbc_begindatum"),
    date("beh_dbc_einddatum"),
  ],
  natural_key: &["beh_dbc_specialisme_code", "beh_dbc_behandeling_code"],
};

pub static DAG: TableDef = TableDef {
  group:       TableGroup::Dim,
  name:        "DAG",
  key:         Some("dag_id"),
  columns:     &[
    int("dag_id").not_null(),
    date("dag_datum").not_null(),
    int("dag_jaar"),
    int("dag_kwartaal"),
    int("dag_maand"),
    int("dag_week"),
    text("dag_jaar_maand"),
    text("dag_jaar_week"),
  ],
  natural_key: &["dag_datum"],
};

pub static DECLARATIE: TableDef = TableDef {
  group:       TableGroup::Dim,
  name:        "DECLARATIE",
  key:         Some("dcl_id"),
  columns:     &[
    int("dcl_id").not_null(),
    text("dcl_dbc_declaratie_code").not_null(),
    text("dcl_dbc_omschrijving"),
    text("dcl_dbc_specialisme_uitvoerend"),
    text("dcl_dbc_productgroep_code"),
    decimal("dcl_dbc_tarief"),
    text("dcl_dbc_kostensoort"),
    text("dcl_dbc_tarieftype"),
    text("dcl_dbc_declaratie_eenheid"),
    text("dcl_dbc_tariefsoort"),
    text("dcl_dbc_segment_aanduiding"),
    text("dcl_dbc_honorariumsoort"),
    date("dcl_dbc_begindatum"),
    date("dcl_dbc_einddatum"),
  ],
  natural_key: &["dcl_dbc_declaratie_code"],
};

pub static DIAGNOSE: TableDef = TableDef {
  group:       TableGroup::Dim,
  name:        "DIAGNOSE",
  key:         Some("dia_id"),
  columns:     &[
    int("dia_id").not_null(),
    text("dia_dbc_specialisme_code").not_null(),
    text("dia_dbc_diagnose_code").not_null(),
    text("dia_dbc_diagnose_omschrijving"),
    text("dia_dbc_hoofdgroep_code"),
    text("dia_dbc_hoofdgroep_omschrijving"),
    text("dia_dbc_subgroep_code"),
    text("dia_dbc_subgroep_omschrijving"),
    date("dia_dbc_begindatum"),
    date("dia_dbc_einddatum"),
    text("dia_dbc_zorgproductgroep_code"),
    text("dia_dbc_zorgproductgroep_omschrijving"),
  ],
  natural_key: &["dia_dbc_specialisme_code", "dia_dbc_diagnose_code"],
};

pub static LAND: TableDef = TableDef {
  group:       TableGroup::Dim,
  name:        "LAND",
  key:         Some("lnd_id"),
  columns:     &[int("lnd_id").not_null(), text("lnd_land_code").not_null(), text("lnd_land")],
  natural_key: &["lnd_land_code"],
};

pub static SUBTRAJECTNUMMER: TableDef = TableDef {
  group:       TableGroup::Dim,
  name:        "SUBTRAJECTNUMMER",
  key:         Some("stn_id"),
  columns:     &[
    int("stn_id").not_null(),
    text("stn_subtraject_id").not_null(),
    text("stn_subtrajectnummer"),
    text("stn_zorgtrajectnummer"),
    text("stn_zorgtrajectnummer_parent"),
  ],
  natural_key: &["stn_subtraject_id"],
};

pub static ZORGPRODUCT: TableDef = TableDef {
  group:       TableGroup::Dim,
  name:        "ZORGPRODUCT",
  key:         Some("zpr_id"),
  columns:     &[
    int("zpr_id").not_null(),
    text("zpr_dbc_zorgproduct_code").not_null(),
    text("zpr_dbc_zorgproduct_omschrijving_lang"),
    text("zpr_dbc_zorgproduct_omschrijving_latijn"),
    text("zpr_dbc_zorgproduct_omschrijving_consument"),
    text("zpr_dbc_wbmv_code"),
    text("zpr_dbc_wbmv_omschrijving"),
    text("zpr_dbc_wbmv_regeling"),
    text("zpr_dbc_wbmv_info"),
    text("zpr_dbc_zorgproductgroep_code"),
    text("zpr_dbc_zorgproductgroep_omschrijving"),
    date("zpr_dbc_begindatum"),
    date("zpr_dbc_einddatum"),
  ],
  natural_key: &["zpr_dbc_zorgproduct_code"],
};

pub static ZORGTYPE: TableDef = TableDef {
  group:       TableGroup::Dim,
  name:        "ZORGTYPE",
  key:         Some("zgt_id"),
  columns:     &[
    int("zgt_id").not_null(),
    text("zgt_dbc_specialisme_code").not_null(),
    text("zgt_dbc_zorgtype_code").not_null(),
    text("zgt_dbc_zorgtype_omschrijving"),
    text("zgt_dbc_hoofdgroep_code"),
    text("zgt_dbc_hoofdgroep_omschrijving"),
    text("zgt_dbc_subgroep_code"),
    text("zgt_dbc_subgroep_omschrijving"),
    date("zgt_dbc_begindatum"),
    date("zgt_dbc_einddatum"),
  ],
  natural_key: &["zgt_dbc_specialisme_code", "zgt_dbc_zorgtype_code"],
};

pub static ZORGVERLENERSOORT: TableDef = TableDef {
  group:       TableGroup::Dim,
  name:        "ZORGVERLENERSOORT",
  key:         Some("zvs_id"),
  columns:     &[
    int("zvs_id").not_null(),
    text("zvs_specialisme"),
    text("zvs_specialisme_afkorting"),
    text("zvs_vektis_zorgverlenersoort_code").not_null(),
    text("zvs_vektis_zorgverlenersoort_omschrijving"),
    text("zvs_vektis_zorgverlenersoort_info1"),
    text("zvs_vektis_zorgverlenersoort_info2"),
    text("zvs_vektis_zorgverlenersoort_info3"),
    text("zvs_vektis_mutatie_aard"),
    text("zvs_vektis_mutatie_reden"),
    date("zvs_vektis_mutatiedatum"),
    date("zvs_vektis_begindatum"),
    date("zvs_vektis_einddatum"),
  ],
  natural_key: &["zvs_vektis_zorgverlenersoort_code"],
};

pub static ZORGVRAAG: TableDef = TableDef {
  group:       TableGroup::Dim,
  name:        "ZORGVRAAG",
  key:         Some("zgv_id"),
  columns:     &[
    int("zgv_id").not_null(),
    text("zgv_dbc_specialisme_code").not_null(),
    text("zgv_dbc_zorgvraag_code").not_null(),
    text("zgv_dbc_zorgvraag_omschrijving"),
    text("zgv_dbc_hoofdgroep_code"),
    text("zgv_dbc_hoofdgroep_omschrijving"),
    text("zgv_dbc_subgroep_code"),
    text("zgv_dbc_subgroep_omschrijving"),
    date("zgv_dbc_begindatum"),
    date("zgv_dbc_einddatum"),
  ],
  natural_key: &["zgv_dbc_specialisme_code", "zgv_dbc_zorgvraag_code"],
};

pub static SUBTRAJECT: TableDef = TableDef {
  group:       TableGroup::Fct,
  name:        "SUBTRAJECT",
  key:         None,
  columns:     &[
    int("beh_id").not_null().default("-1"),
    int("dag_id_begindatum_zorgtraject").default("-4"),
    int("dag_id_einddatum_zorgtraject").default("-4"),
    int("dag_id_begindatum_subtraject").default("-4"),
    int("dag_id_einddatum_subtraject").default("-4"),
    int("dag_id_declaratiedatum").default("-4"),
    int("dia_id").not_null().default("-1"),
    int("stn_id").not_null().default("-1"),
    int("zgt_id").not_null().default("-1"),
    int("zgv_id").not_null().default("-1"),
    int("zpr_id").not_null().default("-1"),
    int("zvs_id_behandelend").not_null().default("-1"),
    int("zvs_id_verwijzend").not_null().default("-1"),
    int("geslacht").default("0"),
    bit("heeft_oranje_zorgactiviteit"),
    bit("heeft_zorgactiviteit_met_machtiging"),
    bit("is_hoofdtraject"),
    bit("is_aanspraak_zvw"),
    bit("is_aanspraak_zvw_toegepast"),
    bit("is_zorgactiviteitvertaling_toegepast"),
    decimal("fct_omzet_ziekenhuis"),
    decimal("fct_omzet_honorarium_totaal"),
  ],
  natural_key: &[],
};

/// Every table, dimensions first.
pub static ALL_TABLES: [&TableDef; 12] = [
  &AFSLUITREDEN,
  &BEHANDELING,
  &DAG,
  &DECLARATIE,
  &DIAGNOSE,
  &LAND,
  &SUBTRAJECTNUMMER,
  &ZORGPRODUCT,
  &ZORGTYPE,
  &ZORGVERLENERSOORT,
  &ZORGVRAAG,
  &SUBTRAJECT,
];

/// Find a table by its qualified name (`DIM.DAG`), case-insensitively.
pub fn by_qualified_name(name: &str) -> Option<&'static TableDef> {
  ALL_TABLES
    .iter()
    .copied()
    .find(|t| t.qualified_name().eq_ignore_ascii_case(name))
}
