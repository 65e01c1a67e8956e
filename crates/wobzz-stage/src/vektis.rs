//! Dimensions from the Vektis code lists: provider types (COD016) and
//! countries (COD032).

use wobzz_core::{
  Row,
  schema::{LAND, ZORGVERLENERSOORT},
  sentinel::{OPEN_DATETIME, UNKNOWN_DATETIME},
};

use crate::{
  Result,
  frame::Frame,
  normalize::{datetime, pad, unknown_row},
};

/// Medical specialisms by Vektis provider-type code, with their customary
/// abbreviation.
pub const SPECIALISMS: [(&str, &str, &str); 50] = [
  ("0100", "Huisarts, nno", "HUIS"),
  ("0101", "Huisarts, niet apotheekhoudend", "HUIS"),
  ("0110", "Huisarts, apotheekhoudend", "HUIS"),
  ("0120", "Huisarts, alternatief", "HUIS"),
  ("1100", "Kaakchirurgie", "KAAK"),
  ("1101", "Tandartsspecialist, implantoloog", "KAAK"),
  ("1200", "Tandarts, algemeen", "TAND"),
  ("1201", "Tandarts, implantoloog", "TAND"),
  ("1300", "Orthodontist", "ORTHOD"),
  ("1400", "Arbo arts", "ARBO"),
  ("1401", "Arbo arts", "ARBO"),
  ("1402", "Arbo arts", "ARBO"),
  ("1403", "Arbo arts", "ARBO"),
  ("1410", "Arbo arts", "ARBO"),
  ("1900", "Audiologie", "AUDIO"),
  ("0200", "Apotheker", "APOTH"),
  ("2400", "Dietetiek", "DIEET"),
  ("0301", "Oogheelkunde", "OOG"),
  ("0302", "Keel- neus- en oorheelkunde", "KNO"),
  ("0303", "Chirurgie", "CHI"),
  ("0304", "Plastische chirurgie", "PCH"),
  ("0305", "Orthopedie", "ORT"),
  ("0306", "Urologie", "URO"),
  ("0307", "Gynaecologie", "GYN"),
  ("0308", "Neurochirurgie", "NCH"),
  ("0309", "Zenuw - en zielsziekten", "ZNW"),
  ("0310", "Dermatologie", "DER"),
  ("0313", "Interne geneeskunde", "INT"),
  ("0316", "Kindergeneeskunde", "KIN"),
  ("0318", "Gastro-enterologie", "MDL"),
  ("0320", "Cardiologie", "CAR"),
  ("0322", "Longgeneeskunde", "LON"),
  ("0324", "Reumatologie", "REU"),
  ("0326", "Allergologie", "ALR"),
  ("0327", "Revalidatie geneeskunde", "REV"),
  ("0328", "Cardio-pulmonale chirurgie", "CCH"),
  ("0329", "Consultatieve psychiatrie", "CP"),
  ("0330", "Neurologie", "NEU"),
  ("0335", "Klinische geriatrie", "GER"),
  ("0361", "Radiotherapie", "RT"),
  ("0362", "Interventie radiologie", "RAD"),
  ("0363", "Nucleaire geneeskunde", "NUC"),
  ("0386", "Klinische chemie", "KCL"),
  ("0387", "Medische microbiologie", "MM"),
  ("0388", "Pathologie", "PATHO"),
  ("0389", "Anaesthesiologie", "PIJN"),
  ("0390", "Klinische genetica", "GEN"),
  ("0401", "Fysiotherapie", "FYS"),
  ("0405", "Oedeemtherapie", "OEDEEM"),
  ("0501", "Logopedie", "LOGO"),
];

const PROVIDER_COLUMNS: &[(&str, &str)] = &[
  ("Waarde", "zvs_vektis_zorgverlenersoort_code"),
  ("Betekenis", "zvs_vektis_zorgverlenersoort_omschrijving"),
  ("Omschrijving", "zvs_vektis_zorgverlenersoort_info1"),
  ("Toelichting 1", "zvs_vektis_zorgverlenersoort_info2"),
  ("Toelichting 2", "zvs_vektis_zorgverlenersoort_info3"),
  ("Aard mutatie", "zvs_vektis_mutatie_aard"),
  ("Reden mutatie", "zvs_vektis_mutatie_reden"),
  ("Mutatiedatum", "zvs_vektis_mutatiedatum"),
  ("Ingangsdatum", "zvs_vektis_begindatum"),
  ("Expiratiedatum", "zvs_vektis_einddatum"),
];

const COUNTRY_COLUMNS: &[(&str, &str)] =
  &[("Waarde", "lnd_land_code"), ("Betekenis", "lnd_land")];

fn specialisms() -> Frame {
  Frame::new(
    &["zvs_vektis_zorgverlenersoort_code", "zvs_specialisme", "zvs_specialisme_afkorting"],
    SPECIALISMS
      .iter()
      .map(|(code, name, abbrev)| {
        vec![Some((*code).to_owned()), Some((*name).to_owned()), Some((*abbrev).to_owned())]
      })
      .collect(),
  )
}

/// Provider types; only codes of a known medical specialism are kept.
pub fn stage_zorgverlenersoort(codes: &Frame) -> Result<Vec<Row>> {
  let mut frame = codes.clone().select(PROVIDER_COLUMNS)?;
  frame.map_column("zvs_vektis_zorgverlenersoort_code", pad(4))?;
  frame.map_column("zvs_vektis_mutatiedatum", datetime(OPEN_DATETIME))?;
  frame.map_column("zvs_vektis_begindatum", datetime(UNKNOWN_DATETIME))?;
  frame.map_column("zvs_vektis_einddatum", datetime(OPEN_DATETIME))?;
  let frame = frame
    .drop_duplicates_keep_last(&["zvs_vektis_zorgverlenersoort_code"])?
    .inner_join(&specialisms(), &["zvs_vektis_zorgverlenersoort_code"])?;
  tracing::info!(rows = frame.len(), "staged zorgverlenersoorten");
  Ok(frame.into_table(&ZORGVERLENERSOORT, unknown_row(&ZORGVERLENERSOORT, &[])))
}

pub fn stage_land(codes: &Frame) -> Result<Vec<Row>> {
  let frame = codes
    .clone()
    .select(COUNTRY_COLUMNS)?
    .drop_duplicates_keep_last(&["lnd_land_code"])?;
  tracing::info!(rows = frame.len(), "staged landen");
  Ok(frame.into_table(&LAND, unknown_row(&LAND, &[])))
}
