//! `DIM.ZORGPRODUCT` from the Zorgproducten table, enriched with the
//! care-product-group descriptions and the WBMV code table.

use wobzz_core::{Row, schema::ZORGPRODUCT, sentinel::OPEN_DATETIME};

use crate::{
  Result,
  frame::Frame,
  normalize::{datetime, unknown_row},
};

const PRODUCT_COLUMNS: &[(&str, &str)] = &[
  ("Zorgproductcode", "zpr_dbc_zorgproduct_code"),
  ("Zorgproductomschrijving", "zpr_dbc_zorgproduct_omschrijving_lang"),
  ("Zorgproduct latijnse omschrijving", "zpr_dbc_zorgproduct_omschrijving_latijn"),
  ("Zorgproduct consumentenomschrijving", "zpr_dbc_zorgproduct_omschrijving_consument"),
  ("Zorgproduct WBMV code", "zpr_dbc_wbmv_code"),
  ("Zorgproductgroep Code", "zpr_dbc_zorgproductgroep_code"),
  ("Ingangsdatum", "zpr_dbc_begindatum"),
  ("Einddatum", "zpr_dbc_einddatum"),
];

const GROUP_COLUMNS: &[(&str, &str)] = &[
  ("Zorgproductgroep code", "zpr_dbc_zorgproductgroep_code"),
  ("Zorgproductgroep omschrijving", "zpr_dbc_zorgproductgroep_omschrijving"),
];

const WBMV_COLUMNS: &[(&str, &str)] = &[
  ("WBMV_code", "zpr_dbc_wbmv_code"),
  ("WBMV_code_omschrijving", "zpr_dbc_wbmv_omschrijving"),
  ("Betreffende Regeling", "zpr_dbc_wbmv_regeling"),
  ("Aanvullende informatie", "zpr_dbc_wbmv_info"),
];

/// Products without a known group or WBMV code are dropped by the joins.
pub fn stage(products: &Frame, groups: &Frame, wbmv: &Frame) -> Result<Vec<Row>> {
  let mut products = products.clone().select(PRODUCT_COLUMNS)?;
  products.map_column("zpr_dbc_begindatum", datetime(OPEN_DATETIME))?;
  products.map_column("zpr_dbc_einddatum", datetime(OPEN_DATETIME))?;
  let products = products.drop_duplicates_keep_last(&["zpr_dbc_zorgproduct_code"])?;

  let groups = groups
    .clone()
    .select(GROUP_COLUMNS)?
    .drop_duplicates_keep_last(&["zpr_dbc_zorgproductgroep_code"])?;
  let wbmv = wbmv
    .clone()
    .select(WBMV_COLUMNS)?
    .drop_duplicates_keep_last(&["zpr_dbc_wbmv_code"])?;

  let frame = products
    .inner_join(&groups, &["zpr_dbc_zorgproductgroep_code"])?
    .inner_join(&wbmv, &["zpr_dbc_wbmv_code"])?;
  tracing::info!(rows = frame.len(), "staged zorgproducten");
  Ok(frame.into_table(&ZORGPRODUCT, unknown_row(&ZORGPRODUCT, &[])))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn frame(columns: &[(&str, &str)], rows: &[&[&str]]) -> Frame {
    let names: Vec<&str> = columns.iter().map(|(from, _)| *from).collect();
    let rows = rows
      .iter()
      .map(|r| r.iter().map(|v| (!v.is_empty()).then(|| v.to_string())).collect())
      .collect();
    Frame::new(&names, rows)
  }

  #[test]
  fn products_are_enriched_in_destination_order() {
    let products = frame(PRODUCT_COLUMNS, &[
      &["979001001", "oud", "", "", "W1", "979001", "20120101", ""],
      &["979001001", "Knie", "genu", "knie", "W1", "979001", "20130101", "20141231"],
      &["979001002", "Heup", "", "", "W9", "979001", "", ""],
    ]);
    let groups = frame(GROUP_COLUMNS, &[&["979001", "Orthopedie"]]);
    let wbmv = frame(WBMV_COLUMNS, &[&["W1", "Transplantatie", "Regeling", "info"]]);

    let rows = stage(&products, &groups, &wbmv).unwrap();
    assert_eq!(rows.len(), 2);
    let row = &rows[1];
    assert_eq!(row.len(), ZORGPRODUCT.columns.len());
    assert_eq!(row[0].as_deref(), Some("1"));
    assert_eq!(row[1].as_deref(), Some("979001001"));
    assert_eq!(row[2].as_deref(), Some("Knie"));
    assert_eq!(row[6].as_deref(), Some("Transplantatie"));
    assert_eq!(row[10].as_deref(), Some("Orthopedie"));
    assert_eq!(row[11].as_deref(), Some("2013-01-01 00:00:00"));
    assert_eq!(row[12].as_deref(), Some("2014-12-31 00:00:00"));
  }
}
