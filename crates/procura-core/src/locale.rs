//! Locale-sensitive value parsers for the procurement feeds.
//!
//! The feeds mix Spanish and Basque conventions: `.` and `,` swap roles as
//! thousands and decimal separators, dates arrive as `dd/mm/yyyy` or
//! `yyyy/mm/dd`, and affirmatives are written `sí`, `si` or `bai`. None of
//! these functions fail; they return a best-effort value or a sentinel.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

/// Affirmative tokens accepted by [`parse_bool`], compared case-insensitively.
pub const TRUTHY_TOKENS: &[&str] = &["sí", "si", "bai"];

/// Leading integer part: digit runs followed by 3-digit groups, each group
/// optionally introduced by `.` or `,`.
static INTEGER_GROUPS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9]*(?:[.,]?[0-9]{3})*)+").expect("integer group pattern")
});

/// Trailing decimal part: a separator followed by at most two digits.
static DECIMAL_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.,](?:[0-9]{1,2})?$").expect("decimal tail pattern"));

/// Parse an amount whose separators are ambiguous.
///
/// Anchors on digit-group lengths rather than separator characters: 3-digit
/// groups are thousands, a trailing 1–2 digit group is the decimal part.
///
/// ```
/// use procura_core::parse_amount;
///
/// assert_eq!(parse_amount("6.824,37"), Some(6824.37));
/// assert_eq!(parse_amount("4.268.35"), Some(4268.35));
/// assert_eq!(parse_amount("1.555.092"), Some(1555092.0));
/// ```
///
/// Returns `None` when no digits can be recovered.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let integer = INTEGER_GROUPS.find(raw).map_or("", |m| m.as_str());

    let mut normalized: String = integer.chars().filter(char::is_ascii_digit).collect();
    if let Some(tail) = DECIMAL_TAIL.find(raw) {
        // The separator is ASCII, so slicing past it stays on a char boundary.
        normalized.push('.');
        normalized.push_str(&tail.as_str()[1..]);
    }

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an amount from the legacy dialect, where `.` is always the thousands
/// separator and `,` always the decimal separator.
///
/// Garbage yields `0.0`.
pub fn parse_amount_legacy(raw: &str) -> f64 {
    let normalized = raw.trim().replace('.', "").replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Parse a `dd/mm/yyyy` or `yyyy/mm/dd` date, ignoring a trailing time.
///
/// The year is whichever outer part has four digits and is greater than 999.
/// Empty, free-text, or impossible dates yield `None`.
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let date_part = raw?.split_whitespace().next()?;
    let parts: Vec<&str> = date_part.split('/').collect();
    let [first, month, last] = parts.as_slice() else {
        return None;
    };

    let (year, day) = if is_year(first) {
        (first, last)
    } else if is_year(last) {
        (last, first)
    } else {
        return None;
    };

    NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    )
}

fn is_year(part: &str) -> bool {
    part.len() == 4
        && part.bytes().all(|b| b.is_ascii_digit())
        && part.parse::<u32>().is_ok_and(|y| y > 999)
}

/// Spanish/Basque affirmative check. Absent input is `false`.
pub fn parse_bool(raw: Option<&str>) -> bool {
    raw.is_some_and(|value| {
        let value = value.trim().to_lowercase();
        TRUTHY_TOKENS.contains(&value.as_str())
    })
}
