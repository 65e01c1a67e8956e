//! `wobzz`: builds the WOB ZZ star schema from the DBC reference tables
//! and the monthly subtraject extracts.
//!
//! # Usage
//!
//! ```
//! wobzz --config wobzz.toml run-all
//! wobzz stage zorgproduct declaratie
//! wobzz load-facts /data/wob/2012/DIS_RAP_SZG_WOB_STR_700_201201_20140410_1.csv.bz2
//! ```

mod settings;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use settings::EtlConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use wobzz_core::{Warehouse, extract::encoding_for_label, schema::ALL_TABLES};
use wobzz_load::{FileStats, SubtrajectLoader, load_staged_dimensions};
use wobzz_stage::{Dataset, Stager};
use wobzz_store_sqlite::SqliteStore;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "WOB ZZ star-schema ETL")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "wobzz.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Drop and recreate every warehouse table.
  CreateTables,
  /// Write staged dimension extracts; every dataset when none is named.
  Stage { datasets: Vec<Dataset> },
  /// Replace dimension contents with the staged extracts.
  LoadDimensions,
  /// Truncate the fact table and load transaction files; the configured
  /// monthly files when none are named.
  LoadFacts { files: Vec<PathBuf> },
  /// Create tables, stage, load dimensions, then load facts.
  RunAll,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = EtlConfig::load(&cli.config)?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  std::fs::create_dir_all(&cfg.staging_path)
    .with_context(|| format!("failed to create staging directory {:?}", cfg.staging_path))?;

  match cli.command {
    Command::CreateTables => create_tables(&store).await?,
    Command::Stage { datasets } => stage(&cfg, &datasets)?,
    Command::LoadDimensions => load_dimensions(&store, &cfg.staging_path).await?,
    Command::LoadFacts { files } => load_facts(&store, &cfg, files).await?,
    Command::RunAll => {
      create_tables(&store).await?;
      stage(&cfg, &[])?;
      load_dimensions(&store, &cfg.staging_path).await?;
      load_facts(&store, &cfg, Vec::new()).await?;
    }
  }

  Ok(())
}

// ─── Steps ───────────────────────────────────────────────────────────────────

async fn create_tables(store: &SqliteStore) -> anyhow::Result<()> {
  store.create_tables(&ALL_TABLES).await.context("failed to create tables")
}

fn stage(cfg: &EtlConfig, datasets: &[Dataset]) -> anyhow::Result<()> {
  let stager = Stager {
    files:          cfg.reference_files(),
    encoding:       encoding_for_label(&cfg.input_encoding)?,
    calendar_start: cfg.calendar.start,
    calendar_end:   cfg.calendar.end,
    staging_dir:    cfg.staging_path.clone(),
  };
  let datasets = if datasets.is_empty() { &Dataset::ALL[..] } else { datasets };
  for dataset in datasets {
    stager
      .stage(*dataset)
      .with_context(|| format!("failed to stage {dataset}"))?;
  }
  Ok(())
}

async fn load_dimensions(store: &SqliteStore, staging_dir: &Path) -> anyhow::Result<()> {
  let loaded = load_staged_dimensions(store, staging_dir)
    .await
    .context("failed to load staged dimensions")?;
  tracing::info!(tables = loaded.len(), "loaded staged dimensions");
  Ok(())
}

async fn load_facts(store: &SqliteStore, cfg: &EtlConfig, files: Vec<PathBuf>) -> anyhow::Result<()> {
  let files = if files.is_empty() { cfg.fact_files()? } else { files };
  let encoding = encoding_for_label(&cfg.input_encoding)?;

  let mut loader = SubtrajectLoader::open(store, &cfg.staging_path, encoding)
    .await
    .context("failed to prepare fact loader")?
    .with_bulk_size(cfg.facts.bulk_size);
  loader.truncate_facts().await?;

  let mut total = FileStats::default();
  for path in &files {
    let stats = loader
      .load_file(path)
      .await
      .with_context(|| format!("failed to load {path:?}"))?;
    total.records += stats.records;
    total.new_keys += stats.new_keys;
    total.calendar_misses += stats.calendar_misses;
    total.facts_loaded += stats.facts_loaded;
    total.elapsed += stats.elapsed;
  }
  tracing::info!(
    files = files.len(),
    records = total.records,
    new_keys = total.new_keys,
    calendar_misses = total.calendar_misses,
    elapsed = ?total.elapsed,
    "loaded facts",
  );
  Ok(())
}
