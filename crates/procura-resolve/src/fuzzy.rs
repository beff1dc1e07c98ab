//! Fuzzy name matching on a 0–100 scale.
//!
//! The scorer is a weighted combination of whole-string, token-sorted,
//! token-set and best-window similarities, each computed with
//! [`strsim::normalized_levenshtein`] over a normalized form of both names
//! (diacritics folded, lowercase, punctuation as spaces). A candidate is
//! accepted only when its score is strictly greater than the threshold.

use std::collections::BTreeSet;

use crate::slug::fold_diacritics;

/// Scores must exceed this value to be accepted.
pub const FUZZY_THRESHOLD: u8 = 85;

/// Weight applied to token-based scorers.
const TOKEN_SCALE: f64 = 0.95;
/// Length ratio from which best-window matching replaces whole-string matching.
const PARTIAL_FROM: f64 = 1.5;
/// Length ratio from which best-window matches are heavily discounted.
const PARTIAL_FAR: f64 = 8.0;

/// Result of looking a name up in a [`FuzzyIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Resolved { key: String, score: u8 },
    NoCandidate,
    BelowThreshold { best: String, score: u8 },
}

impl MatchOutcome {
    pub fn resolved_key(&self) -> Option<&str> {
        match self {
            Self::Resolved { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Candidate keys with their normalized forms precomputed.
#[derive(Debug, Clone, Default)]
pub struct FuzzyIndex {
    keys: Vec<(String, String)>,
}

impl FuzzyIndex {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = keys
            .into_iter()
            .map(|k| {
                let key = k.into();
                let normalized = normalize(&key);
                (key, normalized)
            })
            .collect();
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Best-scoring key for `query`. Ties go to the earlier key.
    pub fn best_match(&self, query: &str, threshold: u8) -> MatchOutcome {
        let query = normalize(query);
        if query.is_empty() {
            return MatchOutcome::NoCandidate;
        }

        let mut best: Option<(&str, u8)> = None;
        for (key, normalized) in &self.keys {
            let score = weighted_score(&query, normalized);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((key, score));
            }
        }

        match best {
            None => MatchOutcome::NoCandidate,
            Some((key, score)) if score > threshold => MatchOutcome::Resolved {
                key: key.to_string(),
                score,
            },
            Some((key, score)) => MatchOutcome::BelowThreshold {
                best: key.to_string(),
                score,
            },
        }
    }
}

fn normalize(text: &str) -> String {
    let folded = fold_diacritics(text).to_lowercase();
    let spaced: String = folded
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn weighted_score(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (len_a, len_b) = (a.chars().count() as f64, b.chars().count() as f64);
    let len_ratio = len_a.max(len_b) / len_a.min(len_b);
    let base = ratio(a, b);

    let best = if len_ratio < PARTIAL_FROM {
        base.max(token_sort(a, b, ratio) * TOKEN_SCALE)
            .max(token_set(a, b, ratio) * TOKEN_SCALE)
    } else {
        let scale = if len_ratio < PARTIAL_FAR { 0.9 } else { 0.6 };
        base.max(partial_ratio(a, b) * scale)
            .max(token_sort(a, b, partial_ratio) * TOKEN_SCALE * scale)
            .max(token_set(a, b, partial_ratio) * TOKEN_SCALE * scale)
    };

    (best * 100.0).round().clamp(0.0, 100.0) as u8
}

fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Best similarity of the shorter string against every equally long window
/// of the longer one.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let long: Vec<char> = long.chars().collect();
    let width = short.chars().count();
    if width == 0 {
        return 0.0;
    }

    let mut best = 0.0_f64;
    for window in long.windows(width) {
        let candidate: String = window.iter().collect();
        best = best.max(ratio(short, &candidate));
        if best >= 1.0 {
            break;
        }
    }
    best
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn token_sort(a: &str, b: &str, scorer: fn(&str, &str) -> f64) -> f64 {
    scorer(&sorted_tokens(a), &sorted_tokens(b))
}

/// Compares the shared tokens against each side's shared-plus-remaining tokens.
fn token_set(a: &str, b: &str, scorer: fn(&str, &str) -> f64) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    let common = join(tokens_a.intersection(&tokens_b));
    let only_a = join(tokens_a.difference(&tokens_b));
    let only_b = join(tokens_b.difference(&tokens_a));

    let with_a = concat(&common, &only_a);
    let with_b = concat(&common, &only_b);

    let mut best = scorer(&with_a, &with_b);
    if !common.is_empty() {
        best = best.max(scorer(&common, &with_a)).max(scorer(&common, &with_b));
    }
    best
}

fn join<'a, 'b: 'a>(tokens: impl Iterator<Item = &'a &'b str>) -> String {
    tokens.copied().collect::<Vec<_>>().join(" ")
}

fn concat(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{a} {b}"),
    }
}
