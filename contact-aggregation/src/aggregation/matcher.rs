// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Match Scoring
//!
//! [`ContactMatcher`] collects evidence that the raw contact being aggregated
//! belongs to one of the existing aggregates. Name evidence feeds the primary
//! score; phone, e-mail and nickname equality feed the secondary score.
//! Explicit user overrides trump both.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::AggregationConfig;
use crate::name::{NameDistance, NameLookupType};

/// Score of a forced match.
pub const MAX_SCORE: i32 = 100;

/// Score recorded for a phone, e-mail or nickname equality.
pub const SECONDARY_HIT_SCORE: i32 = 71;

/// Primary score of a candidate without name evidence after the secondary
/// candidates were prepared.
pub const NO_DATA: i32 = -1;

/// Multiplier that leaves room for the match count in the ranking score.
pub const SCORE_SCALE: i32 = 1000;

const TYPE_COUNT: usize = NameLookupType::ALL.len();

/// `(min, max)` score for each pair of lookup types.
///
/// Rows are the type of the key generated for the contact being aggregated,
/// columns the type of the stored key it was found under.
#[derive(Debug)]
pub struct ScoreTable {
    ranges: [[(i32, i32); TYPE_COUNT]; TYPE_COUNT],
}

impl ScoreTable {
    /// The shared standard table.
    pub fn standard() -> &'static ScoreTable {
        static TABLE: OnceLock<ScoreTable> = OnceLock::new();
        TABLE.get_or_init(ScoreTable::build)
    }

    fn build() -> Self {
        use NameLookupType::*;

        let mut table = ScoreTable {
            ranges: [[(0, 0); TYPE_COUNT]; TYPE_COUNT],
        };
        table.set(NameExact, NameExact, 99, 99);
        table.set(NameVariant, NameVariant, 90, 90);
        table.set(NameCollationKey, NameCollationKey, 40, 80);
        table.set(NameCollationKey, Nickname, 50, 60);
        table.set(NameCollationKey, EmailBasedNickname, 30, 60);
        for candidate in [Nickname, EmailBasedNickname] {
            for name in NameLookupType::APPROXIMATE {
                table.set(candidate, name, 50, 60);
            }
        }
        table
    }

    fn set(&mut self, candidate: NameLookupType, name: NameLookupType, min: i32, max: i32) {
        self.ranges[candidate.index()][name.index()] = (min, max);
    }

    /// Score range of a candidate key of one type found under a key of another.
    pub fn range(&self, candidate: NameLookupType, name: NameLookupType) -> (i32, i32) {
        self.ranges[candidate.index()][name.index()]
    }
}

/// Evidence collected for one candidate aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchScore {
    pub contact_id: i64,
    pub keep_in: bool,
    pub keep_out: bool,
    pub primary_score: i32,
    pub secondary_score: i32,
    pub match_count: i32,
}

impl MatchScore {
    fn new(contact_id: i64) -> Self {
        MatchScore {
            contact_id,
            keep_in: false,
            keep_out: false,
            primary_score: 0,
            secondary_score: 0,
            match_count: 0,
        }
    }

    fn update_primary(&mut self, score: i32) {
        self.primary_score = self.primary_score.max(score);
        self.match_count += 1;
    }

    fn update_secondary(&mut self, score: i32) {
        self.secondary_score = self.secondary_score.max(score);
        self.match_count += 1;
    }

    /// Primary score, falling back to the secondary one without name evidence.
    fn decisive_score(&self) -> i32 {
        if self.primary_score == NO_DATA {
            self.secondary_score
        } else {
            self.primary_score
        }
    }

    /// Ranking score: the better of both scores, then the amount of evidence.
    pub fn ranking_score(&self) -> i64 {
        if self.keep_out {
            return 0;
        }
        let best = if self.keep_in {
            MAX_SCORE
        } else {
            self.primary_score.max(self.secondary_score)
        };
        best as i64 * SCORE_SCALE as i64 + self.match_count as i64
    }
}

/// Per-decision score accumulator. Candidates keep first-seen order.
pub struct ContactMatcher {
    table: &'static ScoreTable,
    distance: NameDistance,
    approximate_threshold: f32,
    scores: Vec<MatchScore>,
    index: HashMap<i64, usize>,
}

impl Default for ContactMatcher {
    fn default() -> Self {
        Self::new(&AggregationConfig::default())
    }
}

impl ContactMatcher {
    pub fn new(config: &AggregationConfig) -> Self {
        ContactMatcher {
            table: ScoreTable::standard(),
            distance: NameDistance::new(config.max_name_length),
            approximate_threshold: config.approximate_threshold,
            scores: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Forgets all candidates.
    pub fn clear(&mut self) {
        self.scores.clear();
        self.index.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Evidence for one candidate, if it was seen.
    pub fn score(&self, contact_id: i64) -> Option<&MatchScore> {
        self.index.get(&contact_id).map(|&i| &self.scores[i])
    }

    fn entry(&mut self, contact_id: i64) -> &mut MatchScore {
        let next = self.scores.len();
        let i = *self.index.entry(contact_id).or_insert(next);
        if i == next {
            self.scores.push(MatchScore::new(contact_id));
        }
        &mut self.scores[i]
    }

    /// Records a name observation between a generated key and a stored key.
    ///
    /// Equal keys score the pair's maximum. Different keys score only when
    /// `approximate` is set and the pair has a score range; the similarity is
    /// then mapped linearly into that range above the threshold.
    pub fn match_name(
        &mut self,
        contact_id: i64,
        candidate_type: NameLookupType,
        candidate_key: &str,
        name_type: NameLookupType,
        key: &str,
        approximate: bool,
    ) {
        let (min, max) = self.table.range(candidate_type, name_type);
        if max == 0 {
            return;
        }
        if candidate_key == key {
            self.entry(contact_id).update_primary(max);
            return;
        }
        if !approximate || min == max {
            return;
        }

        let similarity = match (hex::decode(candidate_key), hex::decode(key)) {
            (Ok(a), Ok(b)) => self.distance.distance(&a, &b),
            _ => 0.0,
        };
        let score = if similarity > self.approximate_threshold {
            let above = (similarity - self.approximate_threshold) / (1.0 - self.approximate_threshold);
            min + ((max - min) as f32 * above) as i32
        } else {
            0
        };
        self.entry(contact_id).update_primary(score);
    }

    pub fn update_score_with_phone_match(&mut self, contact_id: i64) {
        self.entry(contact_id).update_secondary(SECONDARY_HIT_SCORE);
    }

    pub fn update_score_with_email_match(&mut self, contact_id: i64) {
        self.entry(contact_id).update_secondary(SECONDARY_HIT_SCORE);
    }

    pub fn update_score_with_nickname_match(&mut self, contact_id: i64) {
        self.entry(contact_id).update_secondary(SECONDARY_HIT_SCORE);
    }

    /// Forces the candidate to win.
    pub fn keep_in(&mut self, contact_id: i64) {
        self.entry(contact_id).keep_in = true;
    }

    /// Excludes the candidate from every decision. Overrides `keep_in`.
    pub fn keep_out(&mut self, contact_id: i64) {
        self.entry(contact_id).keep_out = true;
    }

    /// The winning candidate at `threshold`, if any.
    ///
    /// A kept-in candidate wins outright. Otherwise the highest decisive score
    /// at or above the threshold wins; ties go to the first seen.
    pub fn pick_best_match(&self, threshold: i32) -> Option<i64> {
        let mut best: Option<(i64, i32)> = None;
        for score in self.scores.iter().filter(|s| !s.keep_out) {
            if score.keep_in {
                return Some(score.contact_id);
            }
            let s = score.decisive_score();
            if s >= threshold && best.map_or(true, |(_, max)| s > max) {
                best = Some((score.contact_id, s));
            }
        }
        best.map(|(contact_id, _)| contact_id)
    }

    /// Candidates whose secondary evidence alone clears `threshold`.
    ///
    /// Every primary score is reset to [`NO_DATA`] so that a following round
    /// of name comparisons decides on its own; a candidate without any name
    /// data then falls back to its secondary score.
    pub fn prepare_secondary_match_candidates(&mut self, threshold: i32) -> Vec<i64> {
        let mut candidates = Vec::new();
        for score in self.scores.iter_mut().filter(|s| !s.keep_out) {
            if score.secondary_score >= threshold {
                candidates.push(score.contact_id);
            }
            score.primary_score = NO_DATA;
        }
        candidates
    }

    /// Up to `limit` candidates ranked by [`MatchScore::ranking_score`] whose
    /// ranking score reaches `threshold` (before scaling).
    pub fn pick_best_matches(&self, limit: usize, threshold: i32) -> Vec<i64> {
        let scaled = threshold as i64 * SCORE_SCALE as i64;
        let mut ranked: Vec<&MatchScore> = self
            .scores
            .iter()
            .filter(|s| !s.keep_out && s.ranking_score() >= scaled)
            .collect();
        // Stable: equal scores keep first-seen order
        ranked.sort_by(|a, b| b.ranking_score().cmp(&a.ranking_score()));
        ranked.into_iter().take(limit).map(|s| s.contact_id).collect()
    }
}
