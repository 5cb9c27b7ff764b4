//! Text normalization applied to every title before comparison.

use crate::types::{NormalizedString, Token};

/// Fixed substitution table mapping German diacritics to ASCII digraphs.
const DIACRITIC_TABLE: [(char, &str); 7] = [
    ('ä', "ae"),
    ('ö', "oe"),
    ('ü', "ue"),
    ('Ä', "Ae"),
    ('Ö', "Oe"),
    ('Ü', "Ue"),
    ('ß', "ss"),
];

/// Canonicalize a raw title: fold diacritics to ASCII digraphs, collapse
/// whitespace runs, and trim. Pure and total; idempotent by construction
/// (digraph output contains no table characters, and collapsed whitespace
/// stays collapsed).
pub fn normalize<T: AsRef<str>>(text: T) -> NormalizedString {
    normalize_inline_whitespace(fold_diacritics(text.as_ref()))
}

/// Replace every character in the substitution table with its digraph.
/// Characters outside the table pass through unchanged.
pub fn fold_diacritics(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for ch in text.chars() {
        match DIACRITIC_TABLE.iter().find(|(orig, _)| *orig == ch) {
            Some((_, repl)) => folded.push_str(repl),
            None => folded.push(ch),
        }
    }
    folded
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Split a normalized title into lowercased word tokens. Punctuation acts as
/// a separator; empty fragments are dropped.
pub fn tokens(text: &str) -> Vec<Token> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|fragment| !fragment.is_empty())
        .map(|fragment| fragment.to_lowercase())
        .collect()
}
