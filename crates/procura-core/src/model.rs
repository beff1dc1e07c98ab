//! Canonical contract record and the entity references embedded in it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Publication language of a contract document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Es,
    Eu,
}

#[derive(Debug, Error)]
#[error("unknown language: {0:?} (expected \"es\" or \"eu\")")]
pub struct UnknownLanguage(pub String);

impl Language {
    pub const ALL: [Language; 2] = [Language::Es, Language::Eu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::Eu => "eu",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Self::Es),
            "eu" => Ok(Self::Eu),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

/// Contracting authority, embedded in each contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cif: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub slug: String,
}

impl Authority {
    /// The official profile code as an integer, when it is one.
    pub fn code_number(&self) -> Option<i64> {
        self.code.trim().parse().ok()
    }
}

/// A `{name, code}` pair: the human label and the dialect's identifier tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedValue {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
}

impl CodedValue {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offerer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cif: String,
    #[serde(default)]
    pub sme: Option<bool>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Awarded company. `slug` stays empty until identities are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    #[serde(default)]
    pub cif: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(rename = "priceWithVAT", default)]
    pub price_with_vat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjudication_date: Option<NaiveDate>,
}

/// Number of offerers exactly as the source wrote it.
///
/// Numeric values serialize as JSON numbers; anything else (usually the empty
/// string) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OffererCount {
    Count(u64),
    Raw(String),
}

impl Default for OffererCount {
    fn default() -> Self {
        Self::Raw(String::new())
    }
}

impl OffererCount {
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().parse() {
            Ok(n) => Self::Count(n),
            Err(_) => Self::Raw(raw.to_string()),
        }
    }
}

impl fmt::Display for OffererCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Raw(s) => f.write_str(s),
        }
    }
}

/// One contract in one language.
///
/// Winners and resolutions are keyed by the source's own enumeration index;
/// the lowest index is the "first" winner/resolution. Serialized flat, as
/// `winner_0`, `resolution_0`, ... next to the scalar fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ContractDoc", try_from = "ContractDoc")]
pub struct Contract {
    pub id: String,
    pub year: i32,
    pub language: Language,
    pub title: String,
    pub authority: Authority,
    pub budget: Option<f64>,
    pub status: CodedValue,
    pub contract_type: CodedValue,
    pub processing_type: CodedValue,
    pub adjudication_procedure: CodedValue,
    pub minor_contract: Option<bool>,
    pub offerers: Vec<Offerer>,
    pub offerer_count: OffererCount,
    pub winners: BTreeMap<usize, Winner>,
    pub resolutions: BTreeMap<usize, Resolution>,
}

impl Contract {
    pub fn new(id: impl Into<String>, year: i32, language: Language) -> Self {
        Self {
            id: id.into(),
            year,
            language,
            title: String::new(),
            authority: Authority::default(),
            budget: None,
            status: CodedValue::default(),
            contract_type: CodedValue::default(),
            processing_type: CodedValue::default(),
            adjudication_procedure: CodedValue::default(),
            minor_contract: None,
            offerers: Vec::new(),
            offerer_count: OffererCount::default(),
            winners: BTreeMap::new(),
            resolutions: BTreeMap::new(),
        }
    }

    pub fn first_winner(&self) -> Option<&Winner> {
        self.winners.values().next()
    }

    pub fn first_resolution(&self) -> Option<&Resolution> {
        self.resolutions.values().next()
    }

    /// Winner indices lacking a resolution at the same index.
    pub fn unresolved_winners(&self) -> impl Iterator<Item = usize> + '_ {
        self.winners
            .keys()
            .copied()
            .filter(|i| !self.resolutions.contains_key(i))
    }
}

const WINNER_PREFIX: &str = "winner_";
const RESOLUTION_PREFIX: &str = "resolution_";

/// Flat wire shape of [`Contract`].
#[derive(Serialize, Deserialize)]
struct ContractDoc {
    id: String,
    year: i32,
    language: Language,
    #[serde(default)]
    title: String,
    #[serde(default)]
    authority: Authority,
    #[serde(default)]
    budget: Option<f64>,
    #[serde(default)]
    status: CodedValue,
    #[serde(default)]
    contract_type: CodedValue,
    #[serde(default)]
    processing_type: CodedValue,
    #[serde(default)]
    adjudication_procedure: CodedValue,
    #[serde(default)]
    minor_contract: Option<bool>,
    #[serde(default)]
    offerers: Vec<Offerer>,
    #[serde(default)]
    offerer_count: OffererCount,
    #[serde(flatten)]
    indexed: BTreeMap<String, serde_json::Value>,
}

impl From<Contract> for ContractDoc {
    fn from(c: Contract) -> Self {
        let mut indexed = BTreeMap::new();
        for (i, winner) in c.winners {
            // Plain string/option fields: serializing to a Value cannot fail.
            if let Ok(value) = serde_json::to_value(winner) {
                indexed.insert(format!("{WINNER_PREFIX}{i}"), value);
            }
        }
        for (i, resolution) in c.resolutions {
            if let Ok(value) = serde_json::to_value(resolution) {
                indexed.insert(format!("{RESOLUTION_PREFIX}{i}"), value);
            }
        }
        Self {
            id: c.id,
            year: c.year,
            language: c.language,
            title: c.title,
            authority: c.authority,
            budget: c.budget,
            status: c.status,
            contract_type: c.contract_type,
            processing_type: c.processing_type,
            adjudication_procedure: c.adjudication_procedure,
            minor_contract: c.minor_contract,
            offerers: c.offerers,
            offerer_count: c.offerer_count,
            indexed,
        }
    }
}

impl TryFrom<ContractDoc> for Contract {
    type Error = serde_json::Error;

    fn try_from(doc: ContractDoc) -> Result<Self, Self::Error> {
        let mut winners = BTreeMap::new();
        let mut resolutions = BTreeMap::new();
        for (key, value) in doc.indexed {
            if value.is_null() {
                continue;
            }
            if let Some(i) = indexed_key(&key, WINNER_PREFIX) {
                winners.insert(i, serde_json::from_value(value)?);
            } else if let Some(i) = indexed_key(&key, RESOLUTION_PREFIX) {
                resolutions.insert(i, serde_json::from_value(value)?);
            }
        }
        Ok(Self {
            id: doc.id,
            year: doc.year,
            language: doc.language,
            title: doc.title,
            authority: doc.authority,
            budget: doc.budget,
            status: doc.status,
            contract_type: doc.contract_type,
            processing_type: doc.processing_type,
            adjudication_procedure: doc.adjudication_procedure,
            minor_contract: doc.minor_contract,
            offerers: doc.offerers,
            offerer_count: doc.offerer_count,
            winners,
            resolutions,
        })
    }
}

fn indexed_key(key: &str, prefix: &str) -> Option<usize> {
    key.strip_prefix(prefix)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Contract {
        let mut c = Contract::new("123456", 2021, Language::Es);
        c.title = "Suministro de mobiliario".into();
        c.budget = Some(12100.0);
        c.authority = Authority {
            name: "Ayuntamiento de Getxo".into(),
            code: "77".into(),
            ..Default::default()
        };
        c.offerer_count = OffererCount::Count(3);
        for i in 0..11 {
            c.winners.insert(
                i,
                Winner {
                    cif: format!("B{i:08}"),
                    name: format!("Empresa {i}"),
                    slug: String::new(),
                },
            );
        }
        c.resolutions.insert(
            0,
            Resolution {
                price_with_vat: 1000.5,
                adjudication_date: NaiveDate::from_ymd_opt(2021, 3, 4),
            },
        );
        c
    }

    #[test]
    fn language_parse_and_display() {
        assert_eq!("EU".parse::<Language>().unwrap(), Language::Eu);
        assert_eq!(Language::Es.to_string(), "es");
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn serializes_indexed_keys_flat() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["winner_0"]["name"], "Empresa 0");
        assert_eq!(json["winner_10"]["cif"], "B00000010");
        assert_eq!(json["resolution_0"]["priceWithVAT"], 1000.5);
        assert_eq!(json["resolution_0"]["adjudication_date"], "2021-03-04");
        assert_eq!(json["language"], "es");
        assert_eq!(json["offerer_count"], 3);
        assert!(json.get("winners").is_none());
    }

    #[test]
    fn json_roundtrip_keeps_index_order() {
        let c = sample();
        let json = serde_json::to_string(&c).unwrap();
        let parsed: Contract = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, c);
        let order: Vec<usize> = parsed.winners.keys().copied().collect();
        assert_eq!(order, (0..11).collect::<Vec<_>>());
        assert_eq!(parsed.first_winner().unwrap().name, "Empresa 0");
    }

    #[test]
    fn accepts_null_winner_marker() {
        let json = r#"{"id":"1","year":2014,"language":"eu","winner":null,"offerer_count":""}"#;
        let parsed: Contract = serde_json::from_str(json).unwrap();
        assert!(parsed.winners.is_empty());
        assert_eq!(parsed.offerer_count, OffererCount::Raw(String::new()));
    }

    #[test]
    fn offerer_count_preserves_raw_text() {
        assert_eq!(OffererCount::from_raw(" 4 "), OffererCount::Count(4));
        assert_eq!(OffererCount::from_raw(""), OffererCount::Raw(String::new()));
        assert_eq!(OffererCount::from_raw("varios"), OffererCount::Raw("varios".into()));
    }

    #[test]
    fn unresolved_winners_lists_missing_resolutions() {
        let c = sample();
        let missing: Vec<usize> = c.unresolved_winners().collect();
        assert_eq!(missing, (1..11).collect::<Vec<_>>());
    }

    #[test]
    fn authority_code_number() {
        let mut a = Authority::default();
        assert_eq!(a.code_number(), None);
        a.code = " 1234 ".into();
        assert_eq!(a.code_number(), Some(1234));
    }
}
