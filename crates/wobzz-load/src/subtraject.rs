//! The fact loader: streams subtraject transaction files into
//! `FCT.SUBTRAJECT`, resolving every reference to a dimension key.

use std::{
  fs::File,
  io::{BufReader, Read},
  path::{Path, PathBuf},
  time::{Duration, Instant},
};

use encoding_rs::Encoding;
use tokio::sync::mpsc;
use wobzz_core::{
  Row, Sentinel, SurrogateKey, Warehouse,
  extract::{decode_record, reader},
  schema::{
    DAG, DIAGNOSE, SUBTRAJECT, SUBTRAJECTNUMMER, ZORGPRODUCT, ZORGTYPE, ZORGVERLENERSOORT,
    ZORGVRAAG,
  },
  sentinel::{PLACEHOLDER, SHORT_PLACEHOLDER},
  value::{parse_boolean, parse_code, parse_date, parse_int, parse_money},
};

use crate::{
  Error, Result,
  buffer::BulkFactTable,
  dimension::{BulkDimension, CachedDimension},
};

/// Field layout of a transaction record.
pub const FIELDS: [&str; 30] = [
  "datum_aanmaak",
  "landcode",
  "geslacht",
  "verwijzend_specialisme",
  "zorgtrajectnummer",
  "zorgtrajectnummer_parent",
  "begindatum_zorgtraject",
  "einddatum_zorgtraject",
  "declaratiedatasetnummer",
  "subtrajectnummer",
  "subtraject_id",
  "declaratiecode",
  "behandelend_specialisme",
  "zorgtypecode",
  "zorgvraagcode",
  "typerende_diagnose",
  "icd10_vertaling_diagnose",
  "hoofdtraject_indicatie",
  "zorgproductcode",
  "dbc_reden_sluiten",
  "aanspraak_zvw",
  "aanspraak_zvw_toegepast",
  "zorgact_met_machtiging",
  "oranje_zorgactiviteit",
  "zorgactiviteitvertaling_toegepast",
  "begindatum_subtraject",
  "einddatum_subtraject",
  "declaratiedatum",
  "dbc_ziekenhuiskosten",
  "honorarium_totaal",
];

fn field_index(name: &str) -> usize {
  FIELDS.iter().position(|f| *f == name).unwrap_or(FIELDS.len())
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// One transaction record with every field normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct Subtraject {
  pub geslacht:                    i64,
  pub verwijzend_specialisme:      String,
  pub behandelend_specialisme:     String,
  pub zorgtrajectnummer:           String,
  pub zorgtrajectnummer_parent:    String,
  pub subtrajectnummer:            String,
  pub subtraject_id:               String,
  pub zorgtypecode:                String,
  pub zorgvraagcode:               String,
  pub typerende_diagnose:          String,
  pub zorgproductcode:             String,
  pub begindatum_zorgtraject:      String,
  pub einddatum_zorgtraject:       String,
  pub begindatum_subtraject:       String,
  pub einddatum_subtraject:        String,
  pub declaratiedatum:             String,
  pub hoofdtraject:                Option<u8>,
  pub aanspraak_zvw:               Option<u8>,
  pub aanspraak_zvw_toegepast:     Option<u8>,
  pub zorgactiviteit_machtiging:   Option<u8>,
  pub oranje_zorgactiviteit:       Option<u8>,
  pub zorgactiviteitvertaling:     Option<u8>,
  pub ziekenhuiskosten:            String,
  pub honorarium_totaal:           String,
}

impl Subtraject {
  /// Normalise a raw record. Missing trailing fields read as empty; nothing
  /// here fails.
  pub fn parse(fields: &[String]) -> Self {
    let get = |name: &str| -> Option<&str> {
      fields
        .get(field_index(name))
        .map(String::as_str)
        .filter(|v| !v.is_empty())
    };
    let text = |name: &str| get(name).unwrap_or_default().to_owned();

    Self {
      geslacht:                  parse_int(get("geslacht"), 0),
      verwijzend_specialisme:    parse_code(get("verwijzend_specialisme"), 4, PLACEHOLDER),
      behandelend_specialisme:   parse_code(get("behandelend_specialisme"), 4, PLACEHOLDER),
      zorgtrajectnummer:         text("zorgtrajectnummer"),
      zorgtrajectnummer_parent:  text("zorgtrajectnummer_parent"),
      subtrajectnummer:          text("subtrajectnummer"),
      subtraject_id:             get("subtraject_id").unwrap_or(PLACEHOLDER).to_owned(),
      zorgtypecode:              parse_code(get("zorgtypecode"), 2, SHORT_PLACEHOLDER),
      zorgvraagcode:             parse_code(get("zorgvraagcode"), 4, PLACEHOLDER),
      typerende_diagnose:        parse_code(get("typerende_diagnose"), 4, PLACEHOLDER),
      zorgproductcode:           parse_code(get("zorgproductcode"), 9, PLACEHOLDER),
      begindatum_zorgtraject:    parse_date(get("begindatum_zorgtraject")),
      einddatum_zorgtraject:     parse_date(get("einddatum_zorgtraject")),
      begindatum_subtraject:     parse_date(get("begindatum_subtraject")),
      einddatum_subtraject:      parse_date(get("einddatum_subtraject")),
      declaratiedatum:           parse_date(get("declaratiedatum")),
      hoofdtraject:              parse_boolean(get("hoofdtraject_indicatie")),
      aanspraak_zvw:             parse_boolean(get("aanspraak_zvw")),
      aanspraak_zvw_toegepast:   parse_boolean(get("aanspraak_zvw_toegepast")),
      zorgactiviteit_machtiging: parse_boolean(get("zorgact_met_machtiging")),
      oranje_zorgactiviteit:     parse_boolean(get("oranje_zorgactiviteit")),
      zorgactiviteitvertaling:   parse_boolean(get("zorgactiviteitvertaling_toegepast")),
      ziekenhuiskosten:          parse_money(get("dbc_ziekenhuiskosten")).to_string(),
      honorarium_totaal:         parse_money(get("honorarium_totaal")).to_string(),
    }
  }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// What loading one input produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStats {
  pub records:         u64,
  /// Dimension rows created while resolving the input.
  pub new_keys:        u64,
  /// Dates outside the calendar, resolved to the open sentinel.
  pub calendar_misses: u64,
  pub facts_loaded:    u64,
  pub elapsed:         Duration,
}

// ─── Loader ──────────────────────────────────────────────────────────────────

/// Records per message from the reader thread to the resolver.
const RECORD_BATCH: usize = 1024;
/// Batches in flight between the reader thread and the resolver.
const CHANNEL_DEPTH: usize = 8;

type RecordBatch = Result<Vec<Subtraject>>;

/// Open a transaction file, decompressing by extension (`.bz2`, `.zst`).
pub fn open_input(path: &Path) -> Result<Box<dyn Read + Send>> {
  let input_err = |source| Error::Input { path: path.to_owned(), source };
  let file = BufReader::new(File::open(path).map_err(input_err)?);
  let input: Box<dyn Read + Send> = match path.extension().and_then(|e| e.to_str()) {
    Some("bz2") => Box::new(bzip2::read::MultiBzDecoder::new(file)),
    Some("zst") => Box::new(zstd::stream::read::Decoder::with_buffer(file).map_err(input_err)?),
    _ => Box::new(file),
  };
  Ok(input)
}

/// Parse `input` into batches of records for the resolver. Stops at the first
/// malformed record, or once the resolver has hung up.
fn read_records<R: Read>(
  input: R,
  encoding: &'static Encoding,
  path: &Path,
  tx: &mpsc::Sender<RecordBatch>,
) {
  let mut rdr = reader(input, b';', false);
  let mut record = csv::ByteRecord::new();
  let mut batch = Vec::with_capacity(RECORD_BATCH);
  let failure = loop {
    match rdr.read_byte_record(&mut record) {
      Ok(true) => {
        batch.push(Subtraject::parse(&decode_record(&record, encoding)));
        if batch.len() == RECORD_BATCH && tx.blocking_send(Ok(std::mem::take(&mut batch))).is_err() {
          return;
        }
      }
      Ok(false) => break None,
      Err(source) => break Some(Error::Record { path: path.to_owned(), source }),
    }
  };
  if !batch.is_empty() && tx.blocking_send(Ok(batch)).is_err() {
    return;
  }
  if let Some(err) = failure {
    // A closed channel means the load already failed on its own error.
    let _ = tx.blocking_send(Err(err));
  }
}

/// Loads transaction files into the fact table. Holds every dimension the
/// facts reference, prefilled from the store.
pub struct SubtrajectLoader<'a, W: Warehouse> {
  store:             &'a W,
  encoding:          &'static Encoding,
  dag:               CachedDimension,
  diagnose:          CachedDimension,
  zorgtype:          CachedDimension,
  zorgvraag:         CachedDimension,
  zorgproduct:       CachedDimension,
  zorgverlenersoort: CachedDimension,
  subtrajectnummer:  BulkDimension,
  facts:             BulkFactTable,
}

impl<'a, W: Warehouse> SubtrajectLoader<'a, W> {
  /// Prefill every referenced dimension. Bulk buffers are written to
  /// `staging_dir`. Fails if the calendar lacks any reserved row.
  pub async fn open(store: &'a W, staging_dir: &Path, encoding: &'static Encoding) -> Result<Self> {
    let dag = CachedDimension::open(store, &DAG).await?;
    for sentinel in Sentinel::ALL {
      match dag.lookup(&[sentinel.date()]) {
        Ok(key) if key == sentinel.key() => {}
        _ => return Err(Error::MissingSentinel(sentinel)),
      }
    }

    Ok(Self {
      store,
      encoding,
      dag,
      diagnose: CachedDimension::open(store, &DIAGNOSE).await?,
      zorgtype: CachedDimension::open(store, &ZORGTYPE).await?,
      zorgvraag: CachedDimension::open(store, &ZORGVRAAG).await?,
      zorgproduct: CachedDimension::open(store, &ZORGPRODUCT).await?,
      zorgverlenersoort: CachedDimension::open(store, &ZORGVERLENERSOORT).await?,
      subtrajectnummer: BulkDimension::open(store, &SUBTRAJECTNUMMER, staging_dir).await?,
      facts: BulkFactTable::new(&SUBTRAJECT, staging_dir),
    })
  }

  /// Rows per bulk load of facts and of new subtraject numbers.
  pub fn with_bulk_size(mut self, rows: usize) -> Self {
    self.subtrajectnummer = self.subtrajectnummer.with_bulk_size(rows);
    self.facts = self.facts.with_bulk_size(rows);
    self
  }

  /// Empty the fact table ahead of a full reload.
  pub async fn truncate_facts(&self) -> Result<u64> {
    let removed = self.store.truncate(&SUBTRAJECT).await.map_err(|e| Error::Store(Box::new(e)))?;
    tracing::info!(removed, "truncated fact table");
    Ok(removed)
  }

  /// Load one transaction file and commit it.
  pub async fn load_file(&mut self, path: &Path) -> Result<FileStats> {
    tracing::info!(path = %path.display(), "loading transaction file");
    let input = open_input(path)?;
    let stats = self.load(input, path.to_owned()).await?;
    tracing::info!(
      path = %path.display(),
      records = stats.records,
      new_keys = stats.new_keys,
      calendar_misses = stats.calendar_misses,
      elapsed = ?stats.elapsed,
      "finished transaction file",
    );
    Ok(stats)
  }

  /// Load every record of `input`, committing a batch whenever a bulk buffer
  /// fills and once more at the end. Decompression and parsing run on a
  /// blocking thread; `path` is used in errors.
  pub async fn load<R: Read + Send + 'static>(&mut self, input: R, path: PathBuf) -> Result<FileStats> {
    let started = Instant::now();
    let inserted_before = self.inserted();
    let mut stats = FileStats::default();

    let (tx, mut rx) = mpsc::channel(CHANNEL_DEPTH);
    let parser = tokio::task::spawn_blocking({
      let (encoding, path) = (self.encoding, path.clone());
      move || read_records(input, encoding, &path, &tx)
    });

    while let Some(batch) = rx.recv().await {
      for subtraject in batch? {
        let row = self.resolve(&subtraject, &mut stats).await?;
        self.facts.insert(row)?;
        stats.records += 1;
        if self.facts.is_full() || self.subtrajectnummer.is_full() {
          stats.facts_loaded += self.commit().await?;
        }
      }
    }
    parser.await.map_err(Error::Reader)?;

    stats.facts_loaded += self.commit().await?;
    stats.new_keys = self.inserted() - inserted_before;
    stats.elapsed = started.elapsed();
    if stats.calendar_misses > 0 {
      tracing::warn!(path = %path.display(), misses = stats.calendar_misses, "dates outside the calendar resolved to open");
    }
    Ok(stats)
  }

  /// Flush new subtraject numbers, then the facts referencing them. Returns
  /// the facts loaded.
  async fn commit(&mut self) -> Result<u64> {
    self.subtrajectnummer.flush(self.store).await?;
    self.facts.flush(self.store).await
  }

  fn inserted(&self) -> u64 {
    self.diagnose.inserted()
      + self.zorgtype.inserted()
      + self.zorgvraag.inserted()
      + self.zorgproduct.inserted()
      + self.zorgverlenersoort.inserted()
      + self.subtrajectnummer.inserted()
  }

  /// Calendar key of `date`; dates outside the calendar are open.
  fn day(&self, date: &str, stats: &mut FileStats) -> SurrogateKey {
    match self.dag.lookup(&[date]) {
      Ok(key) => key,
      Err(_) => {
        stats.calendar_misses += 1;
        tracing::debug!(date, "date outside calendar");
        Sentinel::Open.key()
      }
    }
  }

  /// Resolve every dimension reference of `s` into a fact row.
  async fn resolve(&mut self, s: &Subtraject, stats: &mut FileStats) -> Result<Row> {
    let store = self.store;
    let dates = [
      self.day(&s.begindatum_zorgtraject, stats),
      self.day(&s.einddatum_zorgtraject, stats),
      self.day(&s.begindatum_subtraject, stats),
      self.day(&s.einddatum_subtraject, stats),
      self.day(&s.declaratiedatum, stats),
    ];

    let dia_id = self
      .diagnose
      .ensure(store, &[
        ("dia_dbc_specialisme_code", s.behandelend_specialisme.clone()),
        ("dia_dbc_diagnose_code", s.typerende_diagnose.clone()),
      ])
      .await?;
    let stn_id = self.subtrajectnummer.ensure(&[
      ("stn_subtraject_id", s.subtraject_id.clone()),
      ("stn_subtrajectnummer", s.subtrajectnummer.clone()),
      ("stn_zorgtrajectnummer", s.zorgtrajectnummer.clone()),
      ("stn_zorgtrajectnummer_parent", s.zorgtrajectnummer_parent.clone()),
    ])?;
    let zgt_id = self
      .zorgtype
      .ensure(store, &[
        ("zgt_dbc_specialisme_code", s.behandelend_specialisme.clone()),
        ("zgt_dbc_zorgtype_code", s.zorgtypecode.clone()),
      ])
      .await?;
    let zgv_id = self
      .zorgvraag
      .ensure(store, &[
        ("zgv_dbc_specialisme_code", s.behandelend_specialisme.clone()),
        ("zgv_dbc_zorgvraag_code", s.zorgvraagcode.clone()),
      ])
      .await?;
    let zpr_id = self
      .zorgproduct
      .ensure(store, &[("zpr_dbc_zorgproduct_code", s.zorgproductcode.clone())])
      .await?;
    let zvs_id_behandelend = self
      .zorgverlenersoort
      .ensure(store, &[("zvs_vektis_zorgverlenersoort_code", s.behandelend_specialisme.clone())])
      .await?;
    let zvs_id_verwijzend = self
      .zorgverlenersoort
      .ensure(store, &[("zvs_vektis_zorgverlenersoort_code", s.verwijzend_specialisme.clone())])
      .await?;

    let key = |k: SurrogateKey| Some(k.to_string());
    let flag = |f: Option<u8>| f.map(|v| v.to_string());
    let mut row: Row = vec![key(Sentinel::Unknown.key())];
    row.extend(dates.into_iter().map(key));
    row.extend([
      key(dia_id),
      key(stn_id),
      key(zgt_id),
      key(zgv_id),
      key(zpr_id),
      key(zvs_id_behandelend),
      key(zvs_id_verwijzend),
      Some(s.geslacht.to_string()),
      flag(s.oranje_zorgactiviteit),
      flag(s.zorgactiviteit_machtiging),
      flag(s.hoofdtraject),
      flag(s.aanspraak_zvw),
      flag(s.aanspraak_zvw_toegepast),
      flag(s.zorgactiviteitvertaling),
      Some(s.ziekenhuiskosten.clone()),
      Some(s.honorarium_totaal.clone()),
    ]);
    Ok(row)
  }
}
