//! URL-safe slugs for authority and company names.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Lowercase ASCII slug: diacritics folded, every other run of
/// non-alphanumerics collapsed to one hyphen, no leading or trailing hyphen.
///
/// ```
/// use procura_resolve::slugify;
///
/// assert_eq!(slugify("Diputación Foral de Álava"), "diputacion-foral-de-alava");
/// assert_eq!(slugify("Señales del Norte, S.L."), "senales-del-norte-s-l");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in fold_diacritics(name).chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else if c == '\'' || c == '’' {
            // Apostrophes join: "L'Hospitalet" → "lhospitalet".
        } else {
            pending_separator = true;
        }
    }
    slug
}

/// Strip combining marks after canonical decomposition, so precomposed and
/// decomposed input fold alike. Letters with no decomposition are spelled out.
pub fn fold_diacritics(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfd() {
        if is_combining_mark(c) {
            continue;
        }
        match spelled_out(c) {
            Some(base) => out.push_str(base),
            None => out.push(c),
        }
    }
    out
}

fn spelled_out(c: char) -> Option<&'static str> {
    Some(match c {
        'ª' => "a",
        'º' => "o",
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'ø' => "o",
        'Ø' => "O",
        'ł' => "l",
        'Ł' => "L",
        'đ' | 'ð' => "d",
        'Đ' | 'Ð' => "D",
        'þ' => "th",
        'Þ' => "TH",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn basque_and_spanish_names() {
        assert_eq!(slugify("Ayuntamiento de Vitoria-Gasteiz"), "ayuntamiento-de-vitoria-gasteiz");
        assert_eq!(slugify("Bilboko Udala"), "bilboko-udala");
        assert_eq!(slugify("  Osakidetza - Servicio Vasco de Salud  "), "osakidetza-servicio-vasco-de-salud");
        assert_eq!(slugify("Construcciones Peña & Hijos, S.A."), "construcciones-pena-hijos-s-a");
        assert_eq!(slugify("Nº 3 Æbleskiver Straße"), "no-3-aebleskiver-strasse");
    }

    #[test]
    fn decomposed_and_non_spanish_letters_fold() {
        assert_eq!(slugify("Mari\u{301}a Lo\u{301}pez"), "maria-lopez");
        assert_eq!(slugify("María López"), slugify("Mari\u{301}a Lo\u{301}pez"));
        assert_eq!(slugify("Łódź Construcciones"), "lodz-construcciones");
        assert_eq!(slugify("Dvořák Ingeniería"), "dvorak-ingenieria");
        assert_eq!(fold_diacritics("Ñandú"), "Nandu");
    }

    #[test]
    fn apostrophes_do_not_split_words() {
        assert_eq!(slugify("L'Hospitalet"), "lhospitalet");
    }

    #[test]
    fn empty_and_symbol_only_names() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("--- ,, ---"), "");
    }

    proptest! {
        #[test]
        fn slug_is_url_safe_and_stable(name in "\\PC{0,40}") {
            let slug = slugify(&name);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert_eq!(slugify(&slug), slug);
        }
    }
}
