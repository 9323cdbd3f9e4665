// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Match candidates of a raw contact.
//!
//! The keys a raw contact is indexed under are also the keys it is matched
//! by, so both come from [`name_lookup_entries`].

use std::collections::HashSet;

use crate::name::{NameLookupBuilder, NameLookupEntry, NameLookupType};
use crate::raw_contact::DataRow;

/// Shortest prefix (in hex digits, two per byte) used to find approximate matches.
const APPROXIMATE_PREFIX_LEN: usize = 4;

/// Lookup entries for all name-bearing rows of a raw contact, de-duplicated.
pub fn name_lookup_entries(
    builder: &NameLookupBuilder<'_>,
    raw_contact_id: i64,
    rows: &[DataRow],
) -> Vec<NameLookupEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for row in rows {
        let generated = match row {
            DataRow::StructuredName(name) if name.has_components() => {
                builder.build_for_structured_name(raw_contact_id, &name.to_name())
            }
            DataRow::StructuredName(name) => match name.display_name.as_deref() {
                Some(display_name) => builder.build_variants(raw_contact_id, display_name),
                None => Vec::new(),
            },
            DataRow::Nickname { name } => builder.build_for_nickname(raw_contact_id, name),
            DataRow::Email { address } => builder.build_for_email(raw_contact_id, address),
            _ => Vec::new(),
        };
        for entry in generated {
            if seen.insert((entry.name_type, entry.normalized_name.clone())) {
                entries.push(entry);
            }
        }
    }
    entries
}

/// A generated key used to query the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub name_type: NameLookupType,
    pub key: String,
}

impl MatchCandidate {
    /// Whether this key also looks for approximate matches by prefix.
    pub fn is_approximate(&self) -> bool {
        NameLookupType::APPROXIMATE.contains(&self.name_type)
    }

    /// Whether this key was generated from a structured name.
    pub fn is_structured_name(&self) -> bool {
        NameLookupType::STRUCTURED_NAME_BASED.contains(&self.name_type)
    }

    /// Prefix shared by every key it may approximately match.
    pub fn prefix(&self) -> &str {
        let end = self.key.len().min(APPROXIMATE_PREFIX_LEN);
        &self.key[..end]
    }
}

/// The keys of one raw contact, in generation order.
#[derive(Debug, Clone, Default)]
pub struct MatchCandidateList {
    candidates: Vec<MatchCandidate>,
}

impl MatchCandidateList {
    pub fn from_entries(entries: &[NameLookupEntry]) -> Self {
        MatchCandidateList {
            candidates: entries
                .iter()
                .map(|entry| MatchCandidate {
                    name_type: entry.name_type,
                    key: entry.normalized_name.clone(),
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchCandidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
