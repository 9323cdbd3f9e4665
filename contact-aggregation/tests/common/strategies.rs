// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.

use proptest::prelude::*;

// ============================================================
// Name Strategies
// ============================================================

/// Single capitalized name word.
pub fn name_word_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,11}"
}

/// Full names of one to five words.
pub fn full_name_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(name_word_strategy(), 1..=5).prop_map(|words| words.join(" "))
}

/// Names with accents, punctuation and mixed case.
pub fn messy_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-zÀ-ÖØ-Þà-öø-ÿ][A-Za-zÀ-ÖØ-Þà-öø-ÿ '.,-]{0,30}"
}

// ============================================================
// Lookup Key Strategies
// ============================================================

/// Source ids, including ones with literal dots that need escaping.
pub fn source_id_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.@-]{1,24}".prop_filter("no dot at the ends", |s| {
        !s.starts_with('.') && !s.ends_with('.')
    })
}

/// Optional `(account_type, account_name)` pair.
pub fn account_strategy() -> impl Strategy<Value = Option<(String, String)>> {
    prop::option::of(("[a-z]{3,8}\\.[a-z]{3,8}", "[a-z]{3,10}@[a-z]{3,8}\\.com"))
}

/// Phone numbers with formatting noise.
pub fn phone_strategy() -> impl Strategy<Value = String> {
    "[0-9]{10}".prop_map(|n| format!("+1 ({}) {}-{}", &n[0..3], &n[3..6], &n[6..]))
}
