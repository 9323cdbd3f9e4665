// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Phone number normalization for equality matching.

/// Number of trailing digits two numbers must share to be considered equal.
pub const MIN_MATCH_DIGITS: usize = 7;

/// Normalizes phone numbers into comparable keys.
pub trait PhoneNormalizer: Send + Sync {
    /// Canonical form of a number as dialed.
    fn normalize(&self, number: &str) -> String;

    /// Key compared when matching numbers across raw contacts.
    fn min_match(&self, number: &str) -> String;
}

/// Locale-free normalizer: digits plus an optional leading `+`.
///
/// Matching uses the last seven digits reversed, so a number with and
/// without country code still meets in the index.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigitsPhoneNormalizer;

impl PhoneNormalizer for DigitsPhoneNormalizer {
    fn normalize(&self, number: &str) -> String {
        let trimmed = number.trim_start();
        let mut normalized = String::with_capacity(trimmed.len());
        if trimmed.starts_with('+') {
            normalized.push('+');
        }
        normalized.extend(trimmed.chars().filter(|c| c.is_ascii_digit()));
        normalized
    }

    fn min_match(&self, number: &str) -> String {
        number
            .chars()
            .rev()
            .filter(|c| c.is_ascii_digit())
            .take(MIN_MATCH_DIGITS)
            .collect()
    }
}
