//! Validated run configuration, independent of argument parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use procura_core::Language;
use procura_resolve::FUZZY_THRESHOLD;

/// Everything one pipeline run needs.
///
/// Input layout under `data_dir`:
///
/// ```text
/// contracts/<year>/<folder>/<lang>/data.xml
/// cache/contractors.json
/// cifs/data.csv
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Years to process; empty means every year folder found on disk.
    pub years: Vec<i32>,
    pub languages: Vec<Language>,
    /// Reprocess folders whose record already exists.
    pub update: bool,
    pub concurrency: usize,
    pub fuzzy_threshold: u8,
    pub fuzzy_authority_cif: bool,
    pub parquet: bool,
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            out_dir: out_dir.into(),
            years: Vec::new(),
            languages: Language::ALL.to_vec(),
            update: false,
            concurrency: default_concurrency(),
            fuzzy_threshold: FUZZY_THRESHOLD,
            fuzzy_authority_cif: true,
            parquet: false,
        }
    }

    /// Reject values the driver cannot run with and drop duplicate entries.
    pub fn validate(mut self) -> anyhow::Result<Self> {
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.fuzzy_threshold > 100 {
            bail!("fuzzy threshold must be within 0..=100, got {}", self.fuzzy_threshold);
        }
        if self.languages.is_empty() {
            bail!("at least one language is required");
        }
        self.languages.sort();
        self.languages.dedup();
        self.years.sort_unstable();
        self.years.dedup();
        Ok(self)
    }

    pub fn contracts_dir(&self) -> PathBuf {
        self.data_dir.join("contracts")
    }

    pub fn year_dir(&self, year: i32) -> PathBuf {
        self.contracts_dir().join(year.to_string())
    }

    pub fn document_path(&self, year: i32, folder: &str, language: Language) -> PathBuf {
        self.year_dir(year)
            .join(folder)
            .join(language.as_str())
            .join("data.xml")
    }

    pub fn authority_feed(&self) -> PathBuf {
        self.data_dir.join("cache").join("contractors.json")
    }

    pub fn fiscal_table(&self) -> PathBuf {
        self.data_dir.join("cifs").join("data.csv")
    }

    pub fn parquet_dir(&self) -> PathBuf {
        self.out_dir.join("parquet")
    }

    /// The configured years, or every numeric folder under `contracts/`.
    pub fn resolve_years(&self) -> anyhow::Result<Vec<i32>> {
        if !self.years.is_empty() {
            return Ok(self.years.clone());
        }
        let dir = self.contracts_dir();
        let mut years: Vec<i32> = subdirectories(&dir)
            .with_context(|| format!("listing {}", dir.display()))?
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect();
        years.sort_unstable();
        Ok(years)
    }

    /// Contract folders of `year`, sorted; a missing year folder has none.
    pub fn contract_folders(&self, year: i32) -> anyhow::Result<Vec<String>> {
        let dir = self.year_dir(year);
        let mut folders =
            subdirectories(&dir).with_context(|| format!("listing {}", dir.display()))?;
        folders.sort();
        Ok(folders)
    }
}

pub fn default_concurrency() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn subdirectories(dir: &Path) -> std::io::Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
