// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Name Lookup Variants
//!
//! Expands a name into every key under which it should be found: the exact
//! token order, all other token orders, nickname substitutions and the
//! concatenated collation key. Matching then reduces to equality and prefix
//! lookups on the stored keys instead of comparing every pair of contacts.

use std::collections::HashSet;

use super::nickname::NicknameClusters;
use super::normalizer::normalize;
use super::splitter::{Name, NameTokens};

/// Default cap on the number of name tokens that are permuted.
pub const DEFAULT_MAX_TOKENS: usize = 4;

/// Kind of a name lookup key. The discriminant is the stored code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NameLookupType {
    /// Tokens in the order they were entered, joined with `.`.
    NameExact = 0,
    /// Any other token order or a nickname substitution, joined with `.`.
    NameVariant = 1,
    /// Tokens concatenated without separator; compared approximately.
    NameCollationKey = 2,
    /// Local part of an e-mail address.
    EmailBasedNickname = 3,
    /// A nickname data row.
    Nickname = 4,
}

impl NameLookupType {
    pub const ALL: [NameLookupType; 5] = [
        NameLookupType::NameExact,
        NameLookupType::NameVariant,
        NameLookupType::NameCollationKey,
        NameLookupType::EmailBasedNickname,
        NameLookupType::Nickname,
    ];

    /// Types derived from structured names.
    pub const STRUCTURED_NAME_BASED: [NameLookupType; 3] = [
        NameLookupType::NameExact,
        NameLookupType::NameVariant,
        NameLookupType::NameCollationKey,
    ];

    /// Types whose keys are single concatenated tokens and can be compared approximately.
    pub const APPROXIMATE: [NameLookupType; 3] = [
        NameLookupType::NameCollationKey,
        NameLookupType::EmailBasedNickname,
        NameLookupType::Nickname,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Position in [`ALL`](Self::ALL), used to index score tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One row of the name lookup index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameLookupEntry {
    pub raw_contact_id: i64,
    pub name_type: NameLookupType,
    pub normalized_name: String,
}

/// Ordered, de-duplicated collection of generated entries.
struct VariantSink {
    raw_contact_id: i64,
    entries: Vec<NameLookupEntry>,
    seen: HashSet<(NameLookupType, String)>,
}

impl VariantSink {
    fn new(raw_contact_id: i64) -> Self {
        VariantSink {
            raw_contact_id,
            entries: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn push(&mut self, name_type: NameLookupType, normalized_name: String) {
        if normalized_name.is_empty() {
            return;
        }
        if self.seen.insert((name_type, normalized_name.clone())) {
            self.entries.push(NameLookupEntry {
                raw_contact_id: self.raw_contact_id,
                name_type,
                normalized_name,
            });
        }
    }
}

/// Generates name lookup entries.
pub struct NameLookupBuilder<'a> {
    nicknames: &'a dyn NicknameClusters,
    max_tokens: usize,
}

impl<'a> NameLookupBuilder<'a> {
    pub fn new(nicknames: &'a dyn NicknameClusters) -> Self {
        Self::with_max_tokens(nicknames, DEFAULT_MAX_TOKENS)
    }

    /// Uses at most `max_tokens` tokens per name, clamped to `1..=DEFAULT_MAX_TOKENS`.
    pub fn with_max_tokens(nicknames: &'a dyn NicknameClusters, max_tokens: usize) -> Self {
        NameLookupBuilder {
            nicknames,
            max_tokens: max_tokens.clamp(1, DEFAULT_MAX_TOKENS),
        }
    }

    /// Generates all lookup variants of a full name.
    pub fn build_variants(&self, raw_contact_id: i64, full_name: &str) -> Vec<NameLookupEntry> {
        let mut names: Vec<String> = NameTokens::tokenize(full_name)
            .into_tokens()
            .iter()
            .map(|token| normalize(token))
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Vec::new();
        }

        let mut sink = VariantSink::new(raw_contact_id);
        let too_many_tokens = names.len() > self.max_tokens;
        if too_many_tokens {
            sink.push(NameLookupType::NameExact, names.join("."));

            // Keep the longest tokens; the rest only get a coarse key each
            names.sort_by(|a, b| b.len().cmp(&a.len()));
            for extra in &names[self.max_tokens..] {
                sink.push(NameLookupType::NameCollationKey, extra.clone());
            }
            names.truncate(self.max_tokens);
        }

        let clusters: Vec<Vec<String>> = names
            .iter()
            .map(|name| self.nicknames.clusters(name))
            .collect();

        emit_permutations(&mut sink, &mut names, 0, !too_many_tokens, true);
        emit_nickname_permutations(&mut sink, &mut names, &clusters, 0);
        sink.entries
    }

    /// Variants for a name with a given name but no family name.
    pub fn build_given_name_only(&self, raw_contact_id: i64, given: &str) -> Vec<NameLookupEntry> {
        self.single_name_variants(raw_contact_id, given)
    }

    /// Variants for a name with a family name but no given name.
    pub fn build_family_name_only(
        &self,
        raw_contact_id: i64,
        family: &str,
    ) -> Vec<NameLookupEntry> {
        self.single_name_variants(raw_contact_id, family)
    }

    /// Variants for a structured name, ignoring prefix and suffix.
    pub fn build_for_structured_name(
        &self,
        raw_contact_id: i64,
        name: &Name,
    ) -> Vec<NameLookupEntry> {
        let join = |parts: &[Option<&String>]| -> String {
            parts
                .iter()
                .flatten()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        };
        let middle = name.middle.as_ref();

        match (name.given.as_ref(), name.family.as_ref()) {
            (Some(given), Some(family)) => {
                self.build_variants(raw_contact_id, &join(&[Some(given), middle, Some(family)]))
            }
            (Some(given), None) => {
                self.build_given_name_only(raw_contact_id, &join(&[Some(given), middle]))
            }
            (None, Some(family)) => {
                self.build_family_name_only(raw_contact_id, &join(&[middle, Some(family)]))
            }
            (None, None) => match middle {
                Some(middle) => self.build_variants(raw_contact_id, middle),
                None => Vec::new(),
            },
        }
    }

    /// A single nickname entry for a nickname data row.
    pub fn build_for_nickname(&self, raw_contact_id: i64, nickname: &str) -> Vec<NameLookupEntry> {
        let mut sink = VariantSink::new(raw_contact_id);
        sink.push(NameLookupType::Nickname, normalize(nickname));
        sink.entries
    }

    /// A nickname-like entry from the local part of an e-mail address.
    pub fn build_for_email(&self, raw_contact_id: i64, address: &str) -> Vec<NameLookupEntry> {
        let local = address.split('@').next().unwrap_or_default();
        let mut sink = VariantSink::new(raw_contact_id);
        sink.push(NameLookupType::EmailBasedNickname, normalize(local));
        sink.entries
    }

    fn single_name_variants(&self, raw_contact_id: i64, name: &str) -> Vec<NameLookupEntry> {
        let tokens = NameTokens::tokenize(name);
        if tokens.len() > 1 {
            return self.build_variants(raw_contact_id, name);
        }

        let normalized = normalize(name);
        let mut sink = VariantSink::new(raw_contact_id);
        sink.push(NameLookupType::NameExact, normalized.clone());
        sink.push(NameLookupType::NameCollationKey, normalized.clone());
        for cluster in self.nicknames.clusters(&normalized) {
            sink.push(NameLookupType::NameVariant, cluster);
        }
        sink.entries
    }
}

/// Emits every ordering of `names[from..]`. Only the identity ordering is exact.
fn emit_permutations(
    sink: &mut VariantSink,
    names: &mut [String],
    from: usize,
    exact: bool,
    collation_key: bool,
) {
    if from == names.len() {
        let name_type = if exact {
            NameLookupType::NameExact
        } else {
            NameLookupType::NameVariant
        };
        sink.push(name_type, names.join("."));
        if collation_key {
            sink.push(NameLookupType::NameCollationKey, names.concat());
        }
        return;
    }

    for i in from..names.len() {
        names.swap(from, i);
        emit_permutations(sink, names, from + 1, exact && i == from, collation_key);
        names.swap(from, i);
    }
}

/// Substitutes nickname clusters position by position, emitting all orderings
/// for each substitution. Substitutions are not collation equivalent, so no
/// collation keys are produced here.
fn emit_nickname_permutations(
    sink: &mut VariantSink,
    names: &mut [String],
    clusters: &[Vec<String>],
    from: usize,
) {
    for i in from..names.len() {
        if clusters[i].is_empty() {
            continue;
        }
        let original = names[i].clone();
        for cluster in &clusters[i] {
            names[i] = cluster.clone();
            emit_permutations(sink, names, 0, false, false);
            emit_nickname_permutations(sink, names, clusters, i + 1);
        }
        names[i] = original;
    }
}
