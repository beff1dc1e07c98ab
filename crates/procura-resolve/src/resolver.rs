//! Per-contract identity correction against the read-only registries.

use std::sync::Arc;

use procura_core::Contract;
use tracing::debug;

use crate::fuzzy::{FUZZY_THRESHOLD, MatchOutcome};
use crate::registry::Registries;
use crate::slug::slugify;

/// What resolving one contract changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// The authority name was replaced by the registry's long name.
    pub authority_renamed: bool,
    /// The authority cif came from its registry entry.
    pub cif_from_registry: bool,
    /// Outcome of the fuzzy fiscal-id lookup, when it ran.
    pub cif_match: Option<MatchOutcome>,
}

impl ResolveReport {
    pub fn cif_matched(&self) -> bool {
        matches!(self.cif_match, Some(MatchOutcome::Resolved { .. }))
    }
}

/// Corrects authority and winner identities of single contracts.
///
/// Resolution reads only the shared registries, so it is safe to run on any
/// number of workers, and resolving a resolved contract changes nothing.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    registries: Arc<Registries>,
    threshold: u8,
    fuzzy_authority_cif: bool,
}

impl EntityResolver {
    pub fn new(registries: Arc<Registries>) -> Self {
        Self {
            registries,
            threshold: FUZZY_THRESHOLD,
            fuzzy_authority_cif: true,
        }
    }

    /// Scores must exceed `threshold` for a fuzzy match to be applied.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Enable or disable the fuzzy fiscal-id lookup for authorities.
    pub fn with_fuzzy_authority_cif(mut self, enabled: bool) -> Self {
        self.fuzzy_authority_cif = enabled;
        self
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn resolve(&self, contract: Contract) -> Contract {
        self.resolve_with_report(contract).0
    }

    pub fn resolve_with_report(&self, mut contract: Contract) -> (Contract, ResolveReport) {
        let mut report = ResolveReport::default();
        let language = contract.language;
        let authority = &mut contract.authority;

        if let Some(code) = authority.code_number()
            && let Some(entry) = self.registries.authorities.get(code)
        {
            if let Some(name) = entry.name(language)
                && name != authority.name
            {
                authority.name = name.to_string();
                report.authority_renamed = true;
            }
            if authority.cif.is_empty()
                && let Some(cif) = entry.cif()
            {
                authority.cif = cif.to_string();
                report.cif_from_registry = true;
            }
        }

        if self.fuzzy_authority_cif && authority.cif.is_empty() && !authority.name.is_empty() {
            let outcome = self
                .registries
                .fiscal_ids
                .best_match(&authority.name, self.threshold);
            if let MatchOutcome::Resolved { key, score } = &outcome
                && let Some(entry) = self.registries.fiscal_ids.get(key)
            {
                debug!(id = %contract.id, name = %authority.name, matched = %key, score, "authority cif matched");
                authority.cif = entry.cif.clone();
            }
            report.cif_match = Some(outcome);
        }

        authority.slug = slugify(&authority.name);
        for winner in contract.winners.values_mut() {
            winner.slug = slugify(&winner.name);
        }

        (contract, report)
    }
}
