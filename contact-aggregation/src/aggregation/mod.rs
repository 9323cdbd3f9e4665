// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Aggregation Module
//!
//! Matching, aggregation decisions and the debounced pass scheduler.

pub mod aggregator;
pub mod candidates;
pub mod matcher;
pub mod scheduler;

pub use aggregator::{canonical_order, AggregationOutcome, ContactAggregator, PassSummary};
pub use candidates::{name_lookup_entries, MatchCandidate, MatchCandidateList};
pub use matcher::{ContactMatcher, MatchScore, ScoreTable};
pub use scheduler::{
    AggregationPass, AggregationScheduler, CancellationToken, SchedulerStatus, StorePass,
};
