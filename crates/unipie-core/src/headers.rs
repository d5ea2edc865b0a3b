//! Header spelling normalization.
//!
//! Source workbooks spell the same field as `International_Students`,
//! `international students` or `InternationalStudents`. Matching is done on
//! a normalized token: trimmed, lowercased, with `_`, `-` and whitespace
//! removed. Two headers match only when their tokens are equal.

/// Normalize a header (or cell value) for comparison.
#[must_use]
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !(c.is_whitespace() || *c == '_' || *c == '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Return the canonical header whose normalized form equals `observed`'s.
#[must_use]
pub fn match_header<'a>(observed: &str, canonical: &[&'a str]) -> Option<&'a str> {
    let wanted = normalize_header(observed);
    if wanted.is_empty() {
        return None;
    }
    canonical
        .iter()
        .copied()
        .find(|candidate| normalize_header(candidate) == wanted)
}

/// True when `value` restates one of the canonical headers.
#[must_use]
pub fn is_header_echo(value: &str, canonical: &[&str]) -> bool {
    match_header(value, canonical).is_some()
}
