//! Text normalization for search and autocomplete
//!
//! `sortify` produces the case/punctuation-insensitive comparable form
//! used for sortable text; `searchify` turns user input into an
//! anchored, escape-safe store pattern. Search and autocomplete use
//! these identically, so a typed phrase and an indexed word always meet
//! in the same normal form.

/// Reduces a string to its comparable form: lowercase, punctuation
/// stripped, whitespace collapsed.
pub fn sortify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Converts user input into a store-level pattern over sortified text.
/// Metacharacters are escaped; `prefix` anchors the pattern at the
/// start of the field.
pub fn searchify(s: &str, prefix: bool) -> String {
    let escaped = regex::escape(&sortify(s));
    if prefix {
        format!("^{}", escaped)
    } else {
        escaped
    }
}

/// Splits a phrase into its sortified words
pub fn search_words(s: &str) -> Vec<String> {
    sortify(s)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
