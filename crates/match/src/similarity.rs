use std::collections::BTreeSet;

use crate::util::levenshtein_distance;

/// Levenshtein similarity in [0, 100].
fn ratio(a: &str, b: &str) -> u8 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 100;
    }
    let dist = levenshtein_distance(a, b);
    (100.0 * (1.0 - dist as f64 / max_len as f64)).round() as u8
}

/// Token-set similarity in [0, 100]: word order and duplicates are ignored,
/// and a key that is a subset of the other still scores 100. This is what
/// lets "joes coffee" line up with "joes coffee shop".
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return if ta.is_empty() && tb.is_empty() { 100 } else { 0 };
    }

    let shared: Vec<&str> = ta.intersection(&tb).map(String::as_str).collect();
    let only_a: Vec<&str> = ta.difference(&tb).map(String::as_str).collect();
    let only_b: Vec<&str> = tb.difference(&ta).map(String::as_str).collect();

    let base = shared.join(" ");
    let left = append(&base, &only_a);
    let right = append(&base, &only_b);

    ratio(&base, &left)
        .max(ratio(&base, &right))
        .max(ratio(&left, &right))
}

fn tokens(s: &str) -> BTreeSet<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn append(base: &str, extra: &[&str]) -> String {
    if extra.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return extra.join(" ");
    }
    format!("{base} {}", extra.join(" "))
}
