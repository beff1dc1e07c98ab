//! Reference registries, built once per run and read-only afterwards.
//!
//! - [`AuthorityRegistry`]: official profile code → per-language long names,
//!   loaded from the JSON authority feed (`codPerfil`, `nombreLargoEs`,
//!   `nombreLargoEu`).
//! - [`FiscalIdRegistry`]: `"<legal name> <province>"` → CIF, loaded from the
//!   `;`-separated administrations table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use encoding_rs::ISO_8859_15;
use procura_core::Language;
use serde::Deserialize;
use tracing::info;

use crate::RegistryError;
use crate::fuzzy::{FuzzyIndex, MatchOutcome};

// ── Authority registry ──

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityEntry {
    pub code: i64,
    pub name_es: String,
    pub name_eu: String,
    pub cif: String,
    pub province: String,
}

impl AuthorityEntry {
    /// Long name in `language`, if the feed has one.
    pub fn name(&self, language: Language) -> Option<&str> {
        let name = match language {
            Language::Es => &self.name_es,
            Language::Eu => &self.name_eu,
        };
        Some(name.trim()).filter(|n| !n.is_empty())
    }

    pub fn cif(&self) -> Option<&str> {
        Some(self.cif.trim()).filter(|c| !c.is_empty())
    }

    /// Fill blank fields from `other`; populated fields are kept.
    fn merge(&mut self, other: AuthorityEntry) {
        fill(&mut self.name_es, other.name_es);
        fill(&mut self.name_eu, other.name_eu);
        fill(&mut self.cif, other.cif);
        fill(&mut self.province, other.province);
    }
}

fn fill(slot: &mut String, value: String) {
    if slot.trim().is_empty() && !value.trim().is_empty() {
        *slot = value;
    }
}

/// One record of the authority feed. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct FeedRecord {
    #[serde(rename = "codPerfil", default)]
    code: Option<ProfileCode>,
    #[serde(rename = "nombreLargoEs", default)]
    name_es: Option<String>,
    #[serde(rename = "nombreLargoEu", default)]
    name_eu: Option<String>,
    #[serde(default)]
    cif: Option<String>,
    #[serde(rename = "provincia", default)]
    province: Option<String>,
}

/// `codPerfil` appears both as a number and as a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileCode {
    Number(i64),
    Text(String),
}

impl ProfileCode {
    fn value(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthorityRegistry {
    entries: HashMap<i64, AuthorityEntry>,
}

impl AuthorityRegistry {
    /// Load and merge one or more feed files, in order.
    pub fn load(paths: &[PathBuf]) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for path in paths {
            let text = read_to_string(path)?;
            let added = registry.extend_from_json(&text)?;
            info!(path = %path.display(), added, "loaded authority feed");
        }
        Ok(registry)
    }

    pub fn from_json(text: &str) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        registry.extend_from_json(text)?;
        Ok(registry)
    }

    /// Merge a feed into the registry. Duplicate codes keep the first
    /// non-empty value of each field. Returns the number of records read.
    pub fn extend_from_json(&mut self, text: &str) -> Result<usize, RegistryError> {
        let records: Vec<FeedRecord> = serde_json::from_str(text)?;
        let count = records.len();
        for record in records {
            let Some(code) = record.code.as_ref().and_then(ProfileCode::value) else {
                continue;
            };
            self.insert(AuthorityEntry {
                code,
                name_es: record.name_es.unwrap_or_default(),
                name_eu: record.name_eu.unwrap_or_default(),
                cif: record.cif.unwrap_or_default(),
                province: record.province.unwrap_or_default(),
            });
        }
        Ok(count)
    }

    pub fn insert(&mut self, entry: AuthorityEntry) {
        match self.entries.get_mut(&entry.code) {
            Some(existing) => existing.merge(entry),
            None => {
                self.entries.insert(entry.code, entry);
            }
        }
    }

    pub fn get(&self, code: i64) -> Option<&AuthorityEntry> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Fiscal id registry ──

pub const COLUMN_NAME: &str = "Razón social";
pub const COLUMN_PROVINCE: &str = "Provincia";
pub const COLUMN_CIF: &str = "CIF";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiscalIdEntry {
    pub name: String,
    pub province: String,
    pub cif: String,
}

impl FiscalIdEntry {
    /// Lookup key: legal name and province joined by a space.
    pub fn key(&self) -> String {
        format!("{} {}", self.name, self.province)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FiscalIdRegistry {
    entries: Vec<FiscalIdEntry>,
    by_key: HashMap<String, usize>,
    index: FuzzyIndex,
}

impl FiscalIdRegistry {
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let registry = Self::from_csv(&read_to_string(path)?)?;
        info!(path = %path.display(), entries = registry.len(), "loaded fiscal id table");
        Ok(registry)
    }

    /// Parse the `;`-separated table. A later row with the same key replaces
    /// the earlier one.
    pub fn from_csv(text: &str) -> Result<Self, RegistryError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or(RegistryError::MissingColumn { column: name })
        };
        let (name_col, province_col, cif_col) =
            (column(COLUMN_NAME)?, column(COLUMN_PROVINCE)?, column(COLUMN_CIF)?);

        let mut entries: Vec<FiscalIdEntry> = Vec::new();
        let mut by_key = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or_default().trim().to_string();
            let entry = FiscalIdEntry {
                name: field(name_col),
                province: field(province_col),
                cif: field(cif_col),
            };
            let key = entry.key();
            match by_key.get(&key) {
                Some(&i) => entries[i] = entry,
                None => {
                    by_key.insert(key, entries.len());
                    entries.push(entry);
                }
            }
        }

        let index = FuzzyIndex::new(entries.iter().map(FiscalIdEntry::key));
        Ok(Self {
            entries,
            by_key,
            index,
        })
    }

    pub fn get(&self, key: &str) -> Option<&FiscalIdEntry> {
        self.by_key.get(key).map(|&i| &self.entries[i])
    }

    /// Fuzzy-rank every key against `name`.
    pub fn best_match(&self, name: &str, threshold: u8) -> MatchOutcome {
        self.index.best_match(name, threshold)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Both registries, shared read-only across workers.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub authorities: AuthorityRegistry,
    pub fiscal_ids: FiscalIdRegistry,
}

impl Registries {
    pub fn load(authority_feeds: &[PathBuf], fiscal_table: &Path) -> Result<Self, RegistryError> {
        Ok(Self {
            authorities: AuthorityRegistry::load(authority_feeds)?,
            fiscal_ids: FiscalIdRegistry::load(fiscal_table)?,
        })
    }
}

/// UTF-8 first; tables exported by spreadsheet tools fall back to Latin-9.
fn read_to_string(path: &Path) -> Result<String, RegistryError> {
    let bytes = std::fs::read(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            let (text, _) = ISO_8859_15.decode_without_bom_handling(e.as_bytes());
            Ok(text.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FUZZY_THRESHOLD;

    const FEED: &str = r#"[
        {"codPerfil": 1234, "nombreLargoEs": "Ayuntamiento de Bilbao", "nombreLargoEu": "Bilboko Udala"},
        {"codPerfil": "77", "nombreLargoEs": "Diputación Foral de Álava", "nombreLargoEu": ""},
        {"codPerfil": null, "nombreLargoEs": "Sin código"},
        {"codPerfil": "77", "nombreLargoEs": "Otro nombre", "nombreLargoEu": "Arabako Foru Aldundia", "extra": 1}
    ]"#;

    const TABLE: &str = "Razón social;Provincia;CIF\n\
        Ayuntamiento de Getxo;Bizkaia;P4804400A\n\
        Ayuntamiento de Zalla;Bizkaia;P4809700I\n\
        Diputación Foral de Álava;Araba/Álava;S0111001F\n";

    #[test]
    fn authority_codes_accept_numbers_and_strings() {
        let registry = AuthorityRegistry::from_json(FEED).unwrap();
        assert_eq!(registry.len(), 2);
        let bilbao = registry.get(1234).unwrap();
        assert_eq!(bilbao.name(Language::Es), Some("Ayuntamiento de Bilbao"));
        assert_eq!(bilbao.name(Language::Eu), Some("Bilboko Udala"));
    }

    #[test]
    fn duplicate_codes_merge_first_non_empty() {
        let registry = AuthorityRegistry::from_json(FEED).unwrap();
        let alava = registry.get(77).unwrap();
        assert_eq!(alava.name(Language::Es), Some("Diputación Foral de Álava"));
        assert_eq!(alava.name(Language::Eu), Some("Arabako Foru Aldundia"));
        assert_eq!(alava.cif(), None);
    }

    #[test]
    fn two_feeds_are_merged_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        std::fs::write(&first, r#"[{"codPerfil": 5, "nombreLargoEs": "Primero"}]"#).unwrap();
        std::fs::write(
            &second,
            r#"[{"codPerfil": 5, "nombreLargoEs": "Segundo", "cif": "P0000005A"}]"#,
        )
        .unwrap();
        let registry = AuthorityRegistry::load(&[first, second]).unwrap();
        let entry = registry.get(5).unwrap();
        assert_eq!(entry.name_es, "Primero");
        assert_eq!(entry.cif(), Some("P0000005A"));
    }

    #[test]
    fn malformed_feed_is_an_error() {
        assert!(matches!(
            AuthorityRegistry::from_json("{not json"),
            Err(RegistryError::Json(_))
        ));
    }

    #[test]
    fn fiscal_table_keys_by_name_and_province() {
        let registry = FiscalIdRegistry::from_csv(TABLE).unwrap();
        assert_eq!(registry.len(), 3);
        let getxo = registry.get("Ayuntamiento de Getxo Bizkaia").unwrap();
        assert_eq!(getxo.cif, "P4804400A");
    }

    #[test]
    fn fiscal_table_fuzzy_lookup() {
        let registry = FiscalIdRegistry::from_csv(TABLE).unwrap();
        let outcome = registry.best_match("Ayuntamiento de Getxo", FUZZY_THRESHOLD);
        assert_eq!(outcome.resolved_key(), Some("Ayuntamiento de Getxo Bizkaia"));
    }

    #[test]
    fn fiscal_table_requires_its_columns() {
        let err = FiscalIdRegistry::from_csv("Nombre;Provincia;CIF\nx;y;z\n").unwrap_err();
        assert!(matches!(err, RegistryError::MissingColumn { column } if column == COLUMN_NAME));
    }

    #[test]
    fn latin9_table_is_decoded() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        let (bytes, _, _) = ISO_8859_15.encode(TABLE);
        std::fs::write(&path, &bytes).unwrap();
        let registry = FiscalIdRegistry::load(&path).unwrap();
        assert!(registry.get("Diputación Foral de Álava Araba/Álava").is_some());
    }

    #[test]
    fn missing_feed_is_an_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = FiscalIdRegistry::load(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));
    }
}
