//! Contract normalization: decoded attribute tree → canonical [`Contract`].
//!
//! One mapper per dialect. Both default every missing leaf to an empty value
//! and only fail when a dialect's required block is absent.

mod legacy;
mod modern;

use procura_core::{Contract, Language, RawTree};

use crate::NormalizeError;
use crate::decode::MODERN_MARKER;

/// Map a decoded tree to a contract.
///
/// `id` and `year` come from the caller (folder name and partition); the
/// document itself carries neither. An empty tree means no contract is
/// available and yields `Ok(None)`.
pub fn normalize(
    tree: &RawTree,
    id: &str,
    year: i32,
    language: Language,
) -> Result<Option<Contract>, NormalizeError> {
    if tree.is_empty() {
        return Ok(None);
    }

    let mut contract = Contract::new(id, year, language);
    if tree.contains_key(MODERN_MARKER) {
        modern::map(tree, &mut contract)?;
    } else {
        legacy::map(tree, &mut contract)?;
    }
    Ok(Some(contract))
}

/// Budgets are never negative; anything unusable is dropped.
fn valid_budget(amount: f64) -> Option<f64> {
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

/// Text of an optional node, or `""`.
fn text_or_empty(value: Option<&RawTree>) -> String {
    value
        .and_then(RawTree::text)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}
