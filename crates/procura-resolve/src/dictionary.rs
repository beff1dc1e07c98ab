//! Accumulated authority and company dictionary.
//!
//! Folded serially from resolved contracts after the parallel phase. Every
//! merge is first-write-wins per field: a populated value is never replaced,
//! a blank one is filled by the next observation that has it. The fold is
//! therefore insensitive to the order in which contracts arrive, as long as
//! observations do not disagree on populated fields.

use std::collections::BTreeMap;

use procura_core::{Authority, Contract, Language, Winner};
use serde::{Deserialize, Serialize};

/// An authority as observed in each language.
pub type AuthorityLanguages = BTreeMap<Language, Authority>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cif: String,
    #[serde(default)]
    pub sme: Option<bool>,
    #[serde(default)]
    pub slug: String,
}

impl Company {
    fn merge(&mut self, other: Company) {
        fill(&mut self.name, other.name);
        fill(&mut self.cif, other.cif);
        fill(&mut self.slug, other.slug);
        if self.sme.is_none() {
            self.sme = other.sme;
        }
    }
}

fn fill(slot: &mut String, value: String) {
    if slot.is_empty() && !value.is_empty() {
        *slot = value;
    }
}

fn merge_authority(saved: &mut Authority, other: &Authority) {
    fill(&mut saved.name, other.name.clone());
    fill(&mut saved.cif, other.cif.clone());
    fill(&mut saved.code, other.code.clone());
    fill(&mut saved.slug, other.slug.clone());
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityDictionary {
    /// Authority code → language → authority.
    authorities: BTreeMap<String, AuthorityLanguages>,
    /// Companies with a fiscal id, keyed by it.
    companies: BTreeMap<String, Company>,
    /// Companies seen without a fiscal id, keyed by name.
    companies_by_name: BTreeMap<String, Company>,
    /// First fiscal id observed for each company name.
    cif_by_name: BTreeMap<String, String>,
}

impl EntityDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one resolved contract into the dictionary.
    pub fn observe(&mut self, contract: &Contract) {
        let authority = &contract.authority;
        if !authority.code.is_empty() {
            let languages = self.authorities.entry(authority.code.clone()).or_default();
            match languages.get_mut(&contract.language) {
                Some(saved) => merge_authority(saved, authority),
                None => {
                    languages.insert(contract.language, authority.clone());
                }
            }
        }

        for winner in contract.winners.values() {
            let company = Company {
                name: winner.name.clone(),
                cif: winner.cif.clone(),
                sme: sme_of(contract, winner),
                slug: winner.slug.clone(),
            };
            self.add_company(company);
        }
    }

    fn add_company(&mut self, company: Company) {
        if !company.cif.is_empty() {
            if !company.name.is_empty() {
                self.cif_by_name
                    .entry(company.name.clone())
                    .or_insert_with(|| company.cif.clone());
            }
            match self.companies.get_mut(&company.cif) {
                Some(saved) => saved.merge(company),
                None => {
                    self.companies.insert(company.cif.clone(), company);
                }
            }
        } else if !company.name.is_empty() {
            match self.companies_by_name.get_mut(&company.name) {
                Some(saved) => saved.merge(company),
                None => {
                    self.companies_by_name.insert(company.name.clone(), company);
                }
            }
        }
    }

    /// Fill blank identity fields of `contract` from the dictionary.
    ///
    /// Authority cif is taken from any language of the same code, name and
    /// slug only from the same language. Winners are completed from the
    /// company known under their cif, or get a cif when their name was seen
    /// with one. Returns whether anything changed.
    pub fn backfill(&self, contract: &mut Contract) -> bool {
        let mut changed = false;

        if let Some(languages) = self.authorities.get(&contract.authority.code) {
            let authority = &mut contract.authority;
            if let Some(same) = languages.get(&contract.language) {
                changed |= backfill_field(&mut authority.name, &same.name);
                changed |= backfill_field(&mut authority.slug, &same.slug);
            }
            if authority.cif.is_empty() {
                let same_first = languages
                    .get(&contract.language)
                    .into_iter()
                    .chain(languages.values());
                if let Some(cif) = same_first.map(|a| &a.cif).find(|c| !c.is_empty()) {
                    authority.cif = cif.clone();
                    changed = true;
                }
            }
        }

        for winner in contract.winners.values_mut() {
            changed |= self.backfill_winner(winner);
        }
        changed
    }

    fn backfill_winner(&self, winner: &mut Winner) -> bool {
        let mut changed = false;
        if winner.cif.is_empty()
            && let Some(cif) = self.cif_by_name.get(&winner.name)
        {
            winner.cif = cif.clone();
            changed = true;
        }
        let known = if winner.cif.is_empty() {
            self.companies_by_name.get(&winner.name)
        } else {
            self.companies.get(&winner.cif)
        };
        if let Some(company) = known {
            changed |= backfill_field(&mut winner.name, &company.name);
            changed |= backfill_field(&mut winner.slug, &company.slug);
        }
        changed
    }

    pub fn authorities(&self) -> &BTreeMap<String, AuthorityLanguages> {
        &self.authorities
    }

    pub fn companies(&self) -> &BTreeMap<String, Company> {
        &self.companies
    }

    pub fn companies_by_name(&self) -> &BTreeMap<String, Company> {
        &self.companies_by_name
    }

    pub fn company(&self, cif: &str) -> Option<&Company> {
        self.companies.get(cif)
    }

    pub fn authority(&self, code: &str, language: Language) -> Option<&Authority> {
        self.authorities.get(code)?.get(&language)
    }

    pub fn is_empty(&self) -> bool {
        self.authorities.is_empty() && self.companies.is_empty() && self.companies_by_name.is_empty()
    }
}

fn backfill_field(slot: &mut String, known: &str) -> bool {
    if slot.is_empty() && !known.is_empty() {
        *slot = known.to_string();
        true
    } else {
        false
    }
}

/// SME flag of the offerer matching `winner` by cif, else by name.
fn sme_of(contract: &Contract, winner: &Winner) -> Option<bool> {
    let by_cif = || {
        contract
            .offerers
            .iter()
            .find(|o| !winner.cif.is_empty() && o.cif == winner.cif)
    };
    let by_name = || {
        contract
            .offerers
            .iter()
            .find(|o| !winner.name.is_empty() && o.name == winner.name)
    };
    by_cif().or_else(by_name).and_then(|o| o.sme)
}
