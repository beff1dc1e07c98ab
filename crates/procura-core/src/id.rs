//! Contract identifiers.

use uuid::Uuid;

/// Derive a contract id from a source file or folder name.
///
/// The first run of ASCII digits is the id (`"zip_123456.zip"` → `"123456"`).
/// Names without digits get a surrogate derived from the name itself, so
/// re-processing the same source yields the same id.
pub fn contract_id_from_source(name: &str) -> String {
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
            .simple()
            .to_string()
    } else {
        digits
    }
}
