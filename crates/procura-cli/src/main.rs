use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use procura_cli::{PipelineConfig, config::default_concurrency, run_build_dicts, run_process};
use procura_core::Language;
use procura_resolve::FUZZY_THRESHOLD;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Normalize Basque public procurement contracts into canonical records.
#[derive(Parser, Debug)]
#[command(name = "procura", version, about)]
struct Cli {
    /// Input root holding contracts/, cache/contractors.json and cifs/data.csv
    #[arg(long, global = true, default_value = "data", env = "PROCURA_DATA_DIR")]
    data_dir: PathBuf,

    /// Output root for processed records, dictionaries and Parquet files
    #[arg(long, global = true, default_value = "data", env = "PROCURA_OUT_DIR")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode, normalize and resolve contract folders
    Process {
        /// Year to process (repeatable); defaults to every year on disk
        #[arg(long = "year")]
        years: Vec<i32>,

        /// Language to process (repeatable)
        #[arg(long = "language", default_values_t = Language::ALL)]
        languages: Vec<Language>,

        /// Reprocess folders that already have a record
        #[arg(long)]
        update: bool,

        /// Number of folders decoded concurrently
        #[arg(long, env = "PROCURA_CONCURRENCY")]
        concurrency: Option<usize>,

        /// Fuzzy matches must score strictly above this (0-100)
        #[arg(long, default_value_t = FUZZY_THRESHOLD, env = "PROCURA_FUZZY_THRESHOLD")]
        fuzzy_threshold: u8,

        /// Do not look up missing authority fiscal ids by name
        #[arg(long)]
        skip_authority_cif: bool,

        /// Also write one Parquet file per year and language
        #[arg(long)]
        parquet: bool,
    },

    /// Rebuild the entity dictionaries from processed records
    BuildDicts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("procura v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let mut config = PipelineConfig::new(cli.data_dir, cli.out_dir);

    match cli.command {
        Commands::Process {
            years,
            languages,
            update,
            concurrency,
            fuzzy_threshold,
            skip_authority_cif,
            parquet,
        } => {
            config.years = years;
            config.languages = languages;
            config.update = update;
            config.concurrency = concurrency.unwrap_or_else(default_concurrency);
            config.fuzzy_threshold = fuzzy_threshold;
            config.fuzzy_authority_cif = !skip_authority_cif;
            config.parquet = parquet;
            let config = config.validate().context("invalid configuration")?;
            run_process(&config).await?;
        }
        Commands::BuildDicts => {
            let config = config.validate().context("invalid configuration")?;
            run_build_dicts(&config)?;
        }
    }

    Ok(())
}
