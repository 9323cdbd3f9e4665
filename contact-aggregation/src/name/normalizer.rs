// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Name Normalization
//!
//! Produces comparison keys that ignore case, accents and punctuation.
//! Keys are hex encoded so they can be stored and compared as plain text,
//! and decoded back to bytes for approximate matching.

use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Returns the hex encoded primary-strength key of a name.
///
/// Two names produce the same key iff they are equal after dropping
/// punctuation, whitespace, accents and case. The empty string maps to the
/// empty key.
pub fn normalize(name: &str) -> String {
    hex::encode(primary_key(name))
}

/// Orders two names by how much information they carry.
///
/// A name with accents beats one without, mixed case beats all-lowercase,
/// and a longer raw string wins when everything else is equal. Used to pick
/// the display name of an aggregate.
pub fn compare_complexity(a: &str, b: &str) -> Ordering {
    let clean_a = letters_and_digits(a);
    let clean_b = letters_and_digits(b);

    primary_key(&clean_a)
        .cmp(&primary_key(&clean_b))
        .then_with(|| secondary_key(&clean_a).cmp(&secondary_key(&clean_b)))
        // Lowercase sorts after uppercase in byte order; reversed, capitals win
        .then_with(|| clean_b.cmp(&clean_a))
        .then_with(|| a.chars().count().cmp(&b.chars().count()))
}

/// Letters and digits only, decomposed, without marks, lowercased.
fn primary_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Decomposed and lowercased, keeping accents.
fn secondary_key(name: &str) -> String {
    name.nfd()
        .filter(|c| c.is_alphanumeric() || is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn letters_and_digits(name: &str) -> String {
    name.chars().filter(|c| c.is_alphanumeric()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_strips_marks_and_punctuation() {
        assert_eq!(primary_key("José-María O'Neil"), "josemariaoneil");
        assert_eq!(primary_key("  "), "");
    }

    #[test]
    fn test_secondary_key_keeps_accents() {
        assert_ne!(secondary_key("José"), secondary_key("Jose"));
        assert_eq!(secondary_key("JOSÉ"), secondary_key("josé"));
    }
}
