//! `DIM.DECLARATIE` from the Tarieven table. Tariffs arrive in cents and are
//! staged as exact decimals; one row per declaration code, last listed wins.

use wobzz_core::{
  Row,
  schema::DECLARATIE,
  value::{parse_date, parse_money},
};

use crate::{
  Result,
  frame::Frame,
  normalize::{pad, unknown_row},
};

const COLUMNS: &[(&str, &str)] = &[
  ("Declaratiecode", "dcl_dbc_declaratie_code"),
  ("Omschrijving declaratiecode", "dcl_dbc_omschrijving"),
  ("AGB Uitvoerder", "dcl_dbc_specialisme_uitvoerend"),
  ("Productgroepcode", "dcl_dbc_productgroep_code"),
  ("Tarief", "dcl_dbc_tarief"),
  ("Kostensoort", "dcl_dbc_kostensoort"),
  ("Tarieftype", "dcl_dbc_tarieftype"),
  ("Declaratie eenheid", "dcl_dbc_declaratie_eenheid"),
  ("Soort Tarief", "dcl_dbc_tariefsoort"),
  ("Segment aanduiding", "dcl_dbc_segment_aanduiding"),
  ("Soort Honorarium", "dcl_dbc_honorariumsoort"),
  ("Ingangsdatum", "dcl_dbc_begindatum"),
  ("Einddatum", "dcl_dbc_einddatum"),
];

/// `YYYYMMDD` to a full datetime; unknown dates become `1000-01-01`.
fn tariff_date(cell: Option<&str>) -> Option<String> {
  Some(format!("{} 00:00:00", parse_date(cell)))
}

pub fn stage(tariffs: &Frame) -> Result<Vec<Row>> {
  let mut frame = tariffs.clone().select(COLUMNS)?;
  frame.map_column("dcl_dbc_specialisme_uitvoerend", pad(4))?;
  frame.map_column("dcl_dbc_tarief", |cell| Some(parse_money(cell).to_string()))?;
  frame.map_column("dcl_dbc_begindatum", tariff_date)?;
  frame.map_column("dcl_dbc_einddatum", tariff_date)?;
  let frame = frame.drop_duplicates_keep_last(&["dcl_dbc_declaratie_code"])?;
  tracing::info!(rows = frame.len(), "staged tarieven");
  Ok(frame.into_table(&DECLARATIE, unknown_row(&DECLARATIE, &[])))
}
