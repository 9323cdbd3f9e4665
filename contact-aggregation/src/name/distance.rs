// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Approximate Name Distance
//!
//! A Jaro-style similarity over normalized name bytes. It only tolerates a
//! handful of edits: anything beyond four unmatched bytes scores zero, which
//! bounds the work per comparison and keeps long unrelated names apart.

/// Shortest sequence for which an exact prefix counts as a full match.
const MIN_PREFIX_LENGTH: usize = 3;

/// Unmatched bytes (on both sides together) beyond which names are unrelated.
const MAX_MISMATCHES: usize = 4;

/// Number of edit differences at which the score reaches zero.
const DIFFERENCE_SCALE: f32 = 5.0;

/// Default cap on the number of bytes compared.
pub const DEFAULT_MAX_LENGTH: usize = 30;

/// Similarity metric for normalized names.
#[derive(Debug, Clone, Copy)]
pub struct NameDistance {
    max_length: usize,
}

impl Default for NameDistance {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LENGTH)
    }
}

impl NameDistance {
    /// Creates a metric comparing at most `max_length` bytes of each input.
    pub fn new(max_length: usize) -> Self {
        NameDistance { max_length }
    }

    /// Returns the similarity of two byte sequences in `[0, 1]`.
    pub fn distance(&self, a: &[u8], b: &[u8]) -> f32 {
        let (a, b) = if a.len() <= b.len() { (a, b) } else { (b, a) };

        if a.len() >= MIN_PREFIX_LENGTH && b.starts_with(a) {
            return 1.0;
        }

        let a = &a[..a.len().min(self.max_length)];
        let b = &b[..b.len().min(self.max_length)];
        let (len_a, len_b) = (a.len(), b.len());

        let radius = (len_b / 2).saturating_sub(1);
        let mut matched_a = vec![false; len_a];
        let mut matched_b = vec![false; len_b];
        let mut matches = 0;

        for (i, &byte) in a.iter().enumerate() {
            let from = i.saturating_sub(radius);
            let to = (i + radius + 1).min(len_b);
            for j in from..to {
                if !matched_b[j] && b[j] == byte {
                    matched_a[i] = true;
                    matched_b[j] = true;
                    matches += 1;
                    break;
                }
            }
        }

        let mismatches = (len_a - matches) + (len_b - matches);
        if mismatches > MAX_MISMATCHES {
            return 0.0;
        }

        let mut transpositions = 0;
        let mut j = 0;
        for (&byte, _) in a.iter().zip(&matched_a).filter(|(_, &matched)| matched) {
            while !matched_b[j] {
                j += 1;
            }
            if byte != b[j] {
                transpositions += 1;
            }
            j += 1;
        }

        let differences = (mismatches + transpositions) as f32 / 2.0;
        (1.0 - differences / DIFFERENCE_SCALE).max(0.0)
    }
}
