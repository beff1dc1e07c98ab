//! Pipeline driver: contract folders → decode → normalize → resolve → sinks.
//!
//! Folders are processed on a bounded pool of blocking workers, each of which
//! writes the decoded document next to its record and hands back only the
//! resolved contract. Contracts are folded into the entity dictionary
//! serially once every folder of a year is done. Records are backfilled from
//! the complete dictionary and written year by year at the end of the pass.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use futures::StreamExt;
use procura_core::{Contract, Language, contract_id_from_source};
use procura_ingest::{decode_file, normalize};
use procura_resolve::{EntityDictionary, EntityResolver, Registries, ResolveReport};
use procura_store::{ContractSink, JsonStore, ParquetSink, StoreError};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Contract folders visited, across all years.
    pub folders: usize,
    /// Records handed to the sinks.
    pub emitted: usize,
    /// Records loaded from an earlier run instead of re-decoded.
    pub reused: usize,
    /// Folder × language pairs with no decodable document.
    pub missing: usize,
    pub structural_errors: usize,
    pub authorities_renamed: usize,
    pub cifs_matched: usize,
}

struct Job {
    year: i32,
    id: String,
    language: Language,
    path: PathBuf,
}

enum Outcome {
    Fresh {
        contract: Contract,
        report: ResolveReport,
    },
    Reused(Contract),
    Missing,
    Structural,
}

/// Run a full processing pass over the configured years and languages.
pub async fn run_process(config: &PipelineConfig) -> anyhow::Result<PassStats> {
    let start = Instant::now();

    // 1. Reference registries. Failure here aborts before any folder is touched.
    let registries = Registries::load(&[config.authority_feed()], &config.fiscal_table())
        .context("loading reference registries")?;
    info!(
        authorities = registries.authorities.len(),
        fiscal_ids = registries.fiscal_ids.len(),
        "loaded reference registries"
    );
    let resolver = Arc::new(
        EntityResolver::new(Arc::new(registries))
            .with_threshold(config.fuzzy_threshold)
            .with_fuzzy_authority_cif(config.fuzzy_authority_cif),
    );
    let store = JsonStore::new(&config.out_dir);

    // 2. Per year: parallel decode/normalize/resolve, then a serial fold.
    let mut stats = PassStats::default();
    let mut dictionary = EntityDictionary::new();
    let mut records: Vec<(i32, Vec<Contract>)> = Vec::new();

    for year in config.resolve_years()? {
        let folders = config.contract_folders(year)?;
        stats.folders += folders.len();
        info!(year, folders = folders.len(), "processing year");

        let jobs: Vec<Job> = folders
            .iter()
            .flat_map(|folder| {
                config.languages.iter().map(move |&language| Job {
                    year,
                    id: contract_id_from_source(folder),
                    language,
                    path: config.document_path(year, folder, language),
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(jobs.len());
        let mut running = futures::stream::iter(jobs)
            .map(|job| {
                let resolver = Arc::clone(&resolver);
                let store = store.clone();
                let update = config.update;
                tokio::task::spawn_blocking(move || run_job(&job, &resolver, &store, update))
            })
            .buffer_unordered(config.concurrency);
        while let Some(joined) = running.next().await {
            let outcome = joined
                .context("contract worker panicked")?
                .context("writing decoded contract document")?;
            outcomes.push(outcome);
        }

        let mut contracts = fold_year(outcomes, &mut stats);
        contracts.sort_by(|a, b| (&a.id, a.language).cmp(&(&b.id, b.language)));
        for contract in &contracts {
            dictionary.observe(contract);
        }
        records.push((year, contracts));
    }

    // 3. Backfill from the full dictionary and write every record, flushing
    //    the sinks after each year.
    let mut sinks: Vec<Box<dyn ContractSink + Send>> = vec![Box::new(store.clone())];
    if config.parquet {
        sinks.push(Box::new(ParquetSink::new(config.parquet_dir())));
    }
    let mut backfilled = 0usize;
    for (year, mut contracts) in records {
        for contract in &mut contracts {
            if dictionary.backfill(contract) {
                backfilled += 1;
            }
            for sink in &mut sinks {
                sink.write(contract)
                    .with_context(|| format!("writing contract {year}/{}", contract.id))?;
            }
            stats.emitted += 1;
        }
        for sink in &mut sinks {
            sink.finish()
                .with_context(|| format!("flushing contract sinks for {year}"))?;
        }
    }

    // 4. Dictionary dump.
    store
        .write_dictionary(&dictionary)
        .context("writing entity dictionaries")?;

    info!(
        folders = stats.folders,
        emitted = stats.emitted,
        reused = stats.reused,
        missing = stats.missing,
        structural_errors = stats.structural_errors,
        authorities_renamed = stats.authorities_renamed,
        cifs_matched = stats.cifs_matched,
        backfilled,
        elapsed_secs = start.elapsed().as_secs_f64(),
        "pass complete"
    );
    Ok(stats)
}

/// Rebuild the dictionary from every processed record on disk.
///
/// Returns the number of records folded.
pub fn run_build_dicts(config: &PipelineConfig) -> anyhow::Result<usize> {
    let store = JsonStore::new(&config.out_dir);
    let mut dictionary = EntityDictionary::new();
    let mut folded = 0usize;

    for year in store.years().context("listing processed years")? {
        for id in store.contract_ids(year)? {
            for &language in &config.languages {
                let loaded = store
                    .load_contract(year, &id, language)
                    .with_context(|| format!("loading contract {year}/{id}/{language}"))?;
                if let Some(contract) = loaded {
                    dictionary.observe(&contract);
                    folded += 1;
                }
            }
        }
    }

    store
        .write_dictionary(&dictionary)
        .context("writing entity dictionaries")?;
    info!(records = folded, "rebuilt entity dictionaries");
    Ok(folded)
}

fn run_job(
    job: &Job,
    resolver: &EntityResolver,
    store: &JsonStore,
    update: bool,
) -> Result<Outcome, StoreError> {
    if !update {
        match store.load_contract(job.year, &job.id, job.language) {
            Ok(Some(contract)) => return Ok(Outcome::Reused(contract)),
            Ok(None) => {}
            Err(e) => {
                warn!(year = job.year, id = %job.id, language = %job.language, error = %e,
                    "unreadable earlier record, reprocessing");
            }
        }
    }

    let raw = decode_file(&job.path);
    let outcome = match normalize(&raw, &job.id, job.year, job.language) {
        Ok(Some(contract)) => {
            let unresolved: Vec<usize> = contract.unresolved_winners().collect();
            if !unresolved.is_empty() {
                debug!(year = job.year, id = %job.id, language = %job.language, ?unresolved,
                    "winners without a resolution");
            }
            let (contract, report) = resolver.resolve_with_report(contract);
            store.write_raw(&contract, &raw)?;
            Outcome::Fresh { contract, report }
        }
        Ok(None) => {
            debug!(year = job.year, id = %job.id, language = %job.language, "no contract document");
            Outcome::Missing
        }
        Err(e) => {
            warn!(year = job.year, id = %job.id, language = %job.language, error = %e,
                "skipping contract");
            Outcome::Structural
        }
    };
    Ok(outcome)
}

fn fold_year(outcomes: Vec<Outcome>, stats: &mut PassStats) -> Vec<Contract> {
    let mut contracts = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Outcome::Fresh { contract, report } => {
                stats.authorities_renamed += usize::from(report.authority_renamed);
                stats.cifs_matched += usize::from(report.cif_matched());
                contracts.push(contract);
            }
            Outcome::Reused(contract) => {
                stats.reused += 1;
                contracts.push(contract);
            }
            Outcome::Missing => stats.missing += 1,
            Outcome::Structural => stats.structural_errors += 1,
        }
    }
    contracts
}
