// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Nickname Clusters
//!
//! Groups of given names that refer to the same person ("Bob", "Rob",
//! "Robert"). A cluster is identified by the normalized key of its
//! canonical name, so every member of a cluster produces the same
//! substitution token.

use std::collections::HashMap;

use super::normalizer::normalize;

/// Source of nickname clusters, keyed by normalized name.
pub trait NicknameClusters: Send + Sync {
    /// Returns the cluster keys a normalized name belongs to (empty if none).
    fn clusters(&self, normalized_name: &str) -> Vec<String>;
}

const ENGLISH_CLUSTERS: &[&[&str]] = &[
    &["Robert", "Bob", "Bobby", "Rob", "Robby", "Bert"],
    &["William", "Bill", "Billy", "Will", "Willy", "Liam"],
    &["Richard", "Rick", "Ricky", "Dick", "Rich"],
    &["James", "Jim", "Jimmy", "Jamie"],
    &["John", "Jack", "Johnny"],
    &["Elizabeth", "Liz", "Lizzy", "Beth", "Betty", "Eliza"],
    &["Katherine", "Kate", "Kathy", "Katie", "Kat"],
    &["Margaret", "Maggie", "Peggy", "Meg"],
    &["Michael", "Mike", "Mikey", "Mick"],
    &["Thomas", "Tom", "Tommy"],
    &["Joseph", "Joe", "Joey"],
    &["Charles", "Charlie", "Chuck"],
    &["Christopher", "Chris", "Kit"],
    &["Daniel", "Dan", "Danny"],
    &["David", "Dave", "Davy"],
    &["Edward", "Ed", "Eddie", "Ted", "Ned"],
    &["Anthony", "Tony"],
    &["Alexander", "Alex", "Xander"],
    &["Alexandra", "Alex", "Sandra", "Lexi"],
    &["Patricia", "Pat", "Patty", "Trish"],
    &["Susan", "Sue", "Susie"],
    &["Jennifer", "Jen", "Jenny"],
    &["Deborah", "Debbie", "Deb"],
    &["Steven", "Steve"],
    &["Stephen", "Steve"],
    &["Benjamin", "Ben", "Benny"],
    &["Nicholas", "Nick", "Nicky"],
    &["Samuel", "Sam", "Sammy"],
    &["Samantha", "Sam", "Sammy"],
    &["Andrew", "Andy", "Drew"],
    &["Matthew", "Matt"],
    &["Timothy", "Tim", "Timmy"],
    &["Kenneth", "Ken", "Kenny"],
    &["Gregory", "Greg"],
    &["Peter", "Pete"],
    &["Albert", "Al", "Bert"],
    &["Alfred", "Al", "Alf", "Fred"],
    &["Frederick", "Fred", "Freddie"],
];

/// In-memory nickname table.
#[derive(Debug, Clone, Default)]
pub struct NicknameTable {
    clusters: HashMap<String, Vec<String>>,
}

impl NicknameTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with common English given-name clusters.
    pub fn english() -> Self {
        let mut table = Self::new();
        for cluster in ENGLISH_CLUSTERS {
            table.add_cluster(cluster);
        }
        table
    }

    /// Adds a cluster. The first name is the canonical one and names the cluster.
    pub fn add_cluster(&mut self, names: &[&str]) {
        let Some(canonical) = names.first() else {
            return;
        };
        let key = normalize(canonical);
        for name in names {
            let entry = self.clusters.entry(normalize(name)).or_default();
            if !entry.contains(&key) {
                entry.push(key.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

impl NicknameClusters for NicknameTable {
    fn clusters(&self, normalized_name: &str) -> Vec<String> {
        self.clusters
            .get(normalized_name)
            .cloned()
            .unwrap_or_default()
    }
}
