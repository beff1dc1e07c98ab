//! JSON folder tree under an output root:
//!
//! ```text
//! <root>/processed/contracts/<year>/<id>/<lang>/contract.json
//! <root>/processed/contracts/<year>/<id>/<lang>/raw_contract.json
//! <root>/cache/authorities.json
//! <root>/cache/companies.json
//! <root>/cache/companies_names.json
//! ```

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use procura_core::{Contract, Language, RawTree};
use procura_resolve::EntityDictionary;
use serde::Serialize;
use tracing::{debug, info};

use crate::{ContractSink, StoreError};

const CONTRACT_FILE: &str = "contract.json";
const RAW_FILE: &str = "raw_contract.json";

#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn year_dir(&self, year: i32) -> PathBuf {
        self.root
            .join("processed")
            .join("contracts")
            .join(year.to_string())
    }

    pub fn contract_dir(&self, year: i32, id: &str, language: Language) -> PathBuf {
        self.year_dir(year).join(id).join(language.as_str())
    }

    pub fn contract_path(&self, year: i32, id: &str, language: Language) -> PathBuf {
        self.contract_dir(year, id, language).join(CONTRACT_FILE)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Load a previously written record; `Ok(None)` when there is none.
    pub fn load_contract(
        &self,
        year: i32,
        id: &str,
        language: Language,
    ) -> Result<Option<Contract>, StoreError> {
        let path = self.contract_path(year, id, language);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    pub fn load_raw(
        &self,
        year: i32,
        id: &str,
        language: Language,
    ) -> Result<Option<RawTree>, StoreError> {
        let path = self.contract_dir(year, id, language).join(RAW_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&fs::read_to_string(path)?)?))
    }

    /// Years with processed records, ascending.
    pub fn years(&self) -> Result<Vec<i32>, StoreError> {
        let dir = self.root.join("processed").join("contracts");
        let mut years: Vec<i32> = list_dirs(&dir)?
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect();
        years.sort_unstable();
        Ok(years)
    }

    /// Contract ids with processed records in `year`, sorted.
    pub fn contract_ids(&self, year: i32) -> Result<Vec<String>, StoreError> {
        let mut ids = list_dirs(&self.year_dir(year))?;
        ids.sort();
        Ok(ids)
    }

    pub fn write_contract(&self, contract: &Contract) -> Result<PathBuf, StoreError> {
        let dir = self.contract_dir(contract.year, &contract.id, contract.language);
        fs::create_dir_all(&dir)?;
        let path = dir.join(CONTRACT_FILE);
        write_json(&path, contract)?;
        Ok(path)
    }

    pub fn write_raw(&self, contract: &Contract, raw: &RawTree) -> Result<(), StoreError> {
        let dir = self.contract_dir(contract.year, &contract.id, contract.language);
        fs::create_dir_all(&dir)?;
        write_json(&dir.join(RAW_FILE), raw)
    }

    /// Dump the three dictionary files.
    pub fn write_dictionary(&self, dictionary: &EntityDictionary) -> Result<(), StoreError> {
        let dir = self.cache_dir();
        fs::create_dir_all(&dir)?;
        write_json(&dir.join("authorities.json"), dictionary.authorities())?;
        write_json(&dir.join("companies.json"), dictionary.companies())?;
        write_json(&dir.join("companies_names.json"), dictionary.companies_by_name())?;
        info!(
            authorities = dictionary.authorities().len(),
            companies = dictionary.companies().len(),
            companies_without_cif = dictionary.companies_by_name().len(),
            "wrote entity dictionaries"
        );
        Ok(())
    }
}

impl ContractSink for JsonStore {
    fn write(&mut self, contract: &Contract) -> Result<(), StoreError> {
        let path = self.write_contract(contract)?;
        debug!(path = %path.display(), "wrote contract");
        Ok(())
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Names of the subdirectories of `dir`; a missing `dir` has none.
fn list_dirs(dir: &Path) -> Result<Vec<String>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use procura_core::{Authority, Mapping, Winner};
    use tempfile::TempDir;

    fn sample(id: &str, language: Language) -> Contract {
        let mut c = Contract::new(id, 2019, language);
        c.title = "Suministro".into();
        c.authority = Authority {
            name: "Ayuntamiento de Getxo".into(),
            code: "12".into(),
            ..Default::default()
        };
        c.winners.insert(
            0,
            Winner {
                cif: "B1".into(),
                name: "Uno SL".into(),
                slug: "uno-sl".into(),
            },
        );
        c
    }

    #[test]
    fn writes_processed_layout() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonStore::new(dir.path());
        let raw = RawTree::Node(Mapping::from_iter([("contratacion", RawTree::scalar("x"))]));
        let contract = sample("123", Language::Eu);
        store.write_raw(&contract, &raw).unwrap();
        store.write(&contract).unwrap();

        let base = dir.path().join("processed/contracts/2019/123/eu");
        assert!(base.join("contract.json").is_file());
        assert!(base.join("raw_contract.json").is_file());
        assert_eq!(store.load_raw(2019, "123", Language::Eu).unwrap(), Some(raw));
    }

    #[test]
    fn load_roundtrip_and_missing() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        let c = sample("7", Language::Es);
        store.write_contract(&c).unwrap();
        assert_eq!(store.load_contract(2019, "7", Language::Es).unwrap(), Some(c));
        assert_eq!(store.load_contract(2019, "7", Language::Eu).unwrap(), None);
        assert_eq!(store.load_contract(2020, "7", Language::Es).unwrap(), None);
    }

    #[test]
    fn corrupt_record_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        let path = store.contract_path(2019, "9", Language::Es);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{").unwrap();
        assert!(matches!(
            store.load_contract(2019, "9", Language::Es),
            Err(StoreError::Json(_))
        ));
    }

    #[test]
    fn lists_years_and_ids() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        assert!(store.years().unwrap().is_empty());
        for id in ["20", "10"] {
            store.write_contract(&sample(id, Language::Es)).unwrap();
        }
        assert_eq!(store.years().unwrap(), vec![2019]);
        assert_eq!(store.contract_ids(2019).unwrap(), vec!["10", "20"]);
    }

    #[test]
    fn dumps_dictionaries() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        let mut dictionary = EntityDictionary::new();
        dictionary.observe(&sample("1", Language::Es));
        store.write_dictionary(&dictionary).unwrap();

        let authorities: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("cache/authorities.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(authorities["12"]["es"]["name"], "Ayuntamiento de Getxo");
        let companies: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("cache/companies.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(companies["B1"]["slug"], "uno-sl");
        assert!(dir.path().join("cache/companies_names.json").is_file());
    }
}
