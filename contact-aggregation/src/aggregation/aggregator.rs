// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact Aggregator
//!
//! Decides which aggregate a raw contact joins:
//! 1. Overrides: a KEEP_IN partner's aggregate wins outright, KEEP_OUT
//!    partners' aggregates are excluded.
//! 2. Name keys are looked up exactly and, for collation keys, by prefix for
//!    approximate comparison. Equal phone numbers, e-mail addresses and
//!    nicknames add secondary evidence.
//! 3. The best candidate at the primary threshold wins. Failing that,
//!    candidates with enough secondary evidence get their structured names
//!    compared approximately and are re-ranked at the secondary threshold.
//! 4. Without a winner a new aggregate is created.
//!
//! Attaching the raw contact rewrites its lookup rows and recomputes the
//! aggregate's derived fields.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, info};

use super::candidates::{name_lookup_entries, MatchCandidateList};
use super::matcher::{ContactMatcher, MAX_SCORE};
use super::scheduler::CancellationToken;
use crate::config::AggregationConfig;
use crate::contact::{AggregateFields, AggregationException, ContactLookupKey, ExceptionKind};
use crate::error::{AggregationError, AggregationResult};
use crate::name::{normalize, NameLookupBuilder, NameLookupType, NicknameClusters, NicknameTable};
use crate::raw_contact::{AggregationMode, DataRow, RawContact};
use crate::storage::{Storage, StorageError};

/// What happened to a raw contact in one aggregation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationOutcome {
    /// Joined an existing aggregate.
    Joined(i64),
    /// Got a new aggregate of its own.
    Created(i64),
    /// Was already aggregated; nothing changed.
    AlreadyAggregated(i64),
    /// Aggregation is disabled for this raw contact.
    Skipped,
}

impl AggregationOutcome {
    pub fn contact_id(self) -> Option<i64> {
        match self {
            AggregationOutcome::Joined(id)
            | AggregationOutcome::Created(id)
            | AggregationOutcome::AlreadyAggregated(id) => Some(id),
            AggregationOutcome::Skipped => None,
        }
    }
}

/// Counts of one batch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Raw contacts pending when the pass started.
    pub pending: usize,
    pub joined: usize,
    pub created: usize,
    /// Raw contacts that were aggregated, deleted or disabled meanwhile.
    pub skipped: usize,
    /// The pass stopped early on cancellation.
    pub interrupted: bool,
}

/// Aggregation decisions against a [`Storage`].
pub struct ContactAggregator {
    config: AggregationConfig,
    nicknames: Arc<dyn NicknameClusters>,
}

impl Default for ContactAggregator {
    fn default() -> Self {
        ContactAggregator {
            config: AggregationConfig::default(),
            nicknames: Arc::new(NicknameTable::english()),
        }
    }
}

impl ContactAggregator {
    /// Creates an aggregator with the built-in English nickname table.
    pub fn new(config: AggregationConfig) -> AggregationResult<Self> {
        Self::with_nicknames(config, Arc::new(NicknameTable::english()))
    }

    /// Creates an aggregator with a custom nickname table. Fails on an
    /// invalid configuration.
    pub fn with_nicknames(
        config: AggregationConfig,
        nicknames: Arc<dyn NicknameClusters>,
    ) -> AggregationResult<Self> {
        config.validate()?;
        Ok(ContactAggregator { config, nicknames })
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    fn builder(&self) -> NameLookupBuilder<'_> {
        NameLookupBuilder::with_max_tokens(self.nicknames.as_ref(), self.config.max_name_tokens)
    }

    // === Single decisions ===

    /// Aggregates one raw contact and returns its aggregate.
    ///
    /// Returns the current aggregate if it is already aggregated and `None`
    /// if aggregation is disabled for it.
    pub fn aggregate_contact(
        &self,
        storage: &Storage,
        raw_contact_id: i64,
    ) -> AggregationResult<Option<i64>> {
        let outcome = storage.with_transaction(|s| self.aggregate(s, raw_contact_id))?;
        Ok(outcome.contact_id())
    }

    fn aggregate(&self, storage: &Storage, raw_contact_id: i64) -> AggregationResult<AggregationOutcome> {
        let raw = load_raw_contact(storage, raw_contact_id)?;
        if raw.aggregation_mode == AggregationMode::Disabled {
            return Ok(AggregationOutcome::Skipped);
        }
        if let Some(contact_id) = raw.contact_id {
            return Ok(AggregationOutcome::AlreadyAggregated(contact_id));
        }

        let rows = data_rows(storage, raw_contact_id)?;
        let entries = name_lookup_entries(&self.builder(), raw_contact_id, &rows);
        let candidates = MatchCandidateList::from_entries(&entries);

        let (outcome, contact_id) = match self.find_match(storage, &raw, &candidates, &rows)? {
            Some(contact_id) => (AggregationOutcome::Joined(contact_id), contact_id),
            None => {
                let contact_id = storage.insert_contact()?;
                if contact_id <= 0 {
                    return Err(AggregationError::Invariant(format!(
                        "new aggregate for raw contact {} got id {}",
                        raw_contact_id, contact_id
                    )));
                }
                (AggregationOutcome::Created(contact_id), contact_id)
            }
        };

        storage.set_raw_contact_aggregate(raw_contact_id, Some(contact_id))?;
        storage.replace_name_lookups(raw_contact_id, &entries)?;
        self.update_aggregate_data(storage, contact_id)?;

        debug!("Raw contact {} -> {:?}", raw_contact_id, outcome);
        Ok(outcome)
    }

    fn find_match(
        &self,
        storage: &Storage,
        raw: &RawContact,
        candidates: &MatchCandidateList,
        rows: &[DataRow],
    ) -> AggregationResult<Option<i64>> {
        let mut matcher = ContactMatcher::new(&self.config);

        for link in storage.exceptions_for_raw_contact(raw.id)? {
            let Some(other_contact_id) = link.other_contact_id else {
                continue;
            };
            match link.kind {
                ExceptionKind::KeepIn => matcher.keep_in(other_contact_id),
                ExceptionKind::KeepOut => matcher.keep_out(other_contact_id),
            }
        }
        if let Some(forced) = matcher.pick_best_match(MAX_SCORE) {
            debug!("Raw contact {} kept in aggregate {}", raw.id, forced);
            return Ok(Some(forced));
        }

        self.match_names(storage, raw.id, candidates, &mut matcher)?;
        self.match_data(storage, raw.id, rows, &mut matcher)?;
        if let Some(best) = matcher.pick_best_match(self.config.primary_threshold) {
            return Ok(Some(best));
        }

        let secondary = matcher.prepare_secondary_match_candidates(self.config.secondary_threshold);
        if secondary.is_empty() {
            return Ok(None);
        }
        // Only structured-name keys on both sides; nickname and e-mail keys
        // already counted as secondary evidence
        let names = storage.name_lookups_for_contacts(&secondary, &NameLookupType::STRUCTURED_NAME_BASED)?;
        let structured: Vec<_> = candidates
            .iter()
            .filter(|candidate| candidate.is_structured_name())
            .collect();
        for name in &names {
            for candidate in &structured {
                matcher.match_name(
                    name.contact_id,
                    candidate.name_type,
                    &candidate.key,
                    name.name_type,
                    &name.normalized_name,
                    true,
                );
            }
        }
        Ok(matcher.pick_best_match(self.config.secondary_threshold))
    }

    /// Name evidence: exact key lookups, plus prefix lookups for approximate
    /// comparison of collation keys.
    fn match_names(
        &self,
        storage: &Storage,
        raw_contact_id: i64,
        candidates: &MatchCandidateList,
        matcher: &mut ContactMatcher,
    ) -> AggregationResult<()> {
        for candidate in candidates.iter() {
            for hit in storage.find_name_matches(&candidate.key, raw_contact_id)? {
                matcher.match_name(
                    hit.contact_id,
                    candidate.name_type,
                    &candidate.key,
                    hit.name_type,
                    &hit.normalized_name,
                    false,
                );
            }

            if !candidate.is_approximate() {
                continue;
            }
            let hits = storage.find_name_prefix_matches(
                candidate.prefix(),
                &NameLookupType::APPROXIMATE,
                raw_contact_id,
            )?;
            // Equal keys were counted by the exact lookup
            for hit in hits.iter().filter(|hit| hit.normalized_name != candidate.key) {
                matcher.match_name(
                    hit.contact_id,
                    candidate.name_type,
                    &candidate.key,
                    hit.name_type,
                    &hit.normalized_name,
                    true,
                );
            }
        }
        Ok(())
    }

    /// Secondary evidence: equal phone numbers, e-mail addresses and nicknames.
    fn match_data(
        &self,
        storage: &Storage,
        raw_contact_id: i64,
        rows: &[DataRow],
        matcher: &mut ContactMatcher,
    ) -> AggregationResult<()> {
        for row in rows {
            let Some(value) = storage.matching_value(row) else {
                continue;
            };
            for contact_id in storage.find_aggregates_by_data(row.mime_type(), &value, raw_contact_id)? {
                match row {
                    DataRow::Phone { .. } => matcher.update_score_with_phone_match(contact_id),
                    DataRow::Email { .. } => matcher.update_score_with_email_match(contact_id),
                    DataRow::Nickname { .. } => matcher.update_score_with_nickname_match(contact_id),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    // === Batch pass ===

    /// Aggregates every pending DEFAULT-mode raw contact.
    ///
    /// Pending raw contacts are processed in [`canonical_order`], so the
    /// resulting partition does not depend on insertion order. Each raw
    /// contact is committed on its own. Between raw contacts the store lock
    /// is yielded to waiting threads and `cancel` is checked. An error rolls
    /// back the current raw contact and ends the pass.
    pub fn run_pass(
        &self,
        store: &Mutex<Storage>,
        cancel: &CancellationToken,
    ) -> AggregationResult<PassSummary> {
        let started = Instant::now();
        let mut guard = store.lock();
        let pending = canonical_order(&guard, guard.pending_raw_contact_ids()?)?;
        let mut summary = PassSummary {
            pending: pending.len(),
            ..PassSummary::default()
        };
        debug!("Aggregation pass started with {} pending raw contacts", pending.len());

        for raw_contact_id in pending {
            if cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            match guard.with_transaction(|s| self.aggregate(s, raw_contact_id)) {
                Ok(AggregationOutcome::Joined(_)) => summary.joined += 1,
                Ok(AggregationOutcome::Created(_)) => summary.created += 1,
                Ok(_) | Err(AggregationError::RawContactNotFound(_)) => summary.skipped += 1,
                Err(e) => {
                    error!("Aggregation of raw contact {} failed: {}", raw_contact_id, e);
                    return Err(e);
                }
            }
            MutexGuard::bump(&mut guard);
        }

        info!(
            "Aggregation pass {}: {} joined, {} created, {} skipped in {:?}",
            if summary.interrupted { "interrupted" } else { "finished" },
            summary.joined,
            summary.created,
            summary.skipped,
            started.elapsed()
        );
        Ok(summary)
    }

    // === Maintenance ===

    /// Detaches a raw contact so it is aggregated again.
    ///
    /// Disabled raw contacts are left untouched. Returns the raw contact's
    /// mode so the caller can aggregate IMMEDIATE ones right away.
    pub fn mark_for_reaggregation(
        &self,
        storage: &Storage,
        raw_contact_id: i64,
    ) -> AggregationResult<AggregationMode> {
        storage.with_transaction(|s| self.mark(s, raw_contact_id))
    }

    fn mark(&self, storage: &Storage, raw_contact_id: i64) -> AggregationResult<AggregationMode> {
        let raw = load_raw_contact(storage, raw_contact_id)?;
        if raw.aggregation_mode == AggregationMode::Disabled {
            return Ok(raw.aggregation_mode);
        }

        if let Some(contact_id) = raw.contact_id {
            storage.set_raw_contact_aggregate(raw_contact_id, None)?;
            storage.delete_name_lookups(raw_contact_id)?;
            if storage.load_contact(contact_id)?.is_some() {
                self.update_aggregate_data(storage, contact_id)?;
            }
        }
        Ok(raw.aggregation_mode)
    }

    /// Recomputes the derived fields of an aggregate from its members.
    pub fn update_aggregate_data(&self, storage: &Storage, contact_id: i64) -> AggregationResult<()> {
        let members = storage.aggregate_members(contact_id)?;
        if members.is_empty() {
            return Err(AggregationError::ContactNotFound(contact_id));
        }
        let fields = AggregateFields::from_members(&members);
        storage.update_contact_fields(contact_id, &fields)?;
        Ok(())
    }

    /// Aggregates that could be joined with `contact_id`, best first.
    ///
    /// Uses the same evidence as aggregation but ranks every candidate at or
    /// above the suggestion threshold. Does not modify the store.
    pub fn query_suggestions(
        &self,
        storage: &Storage,
        contact_id: i64,
        limit: usize,
    ) -> AggregationResult<Vec<i64>> {
        storage.with_read_transaction(|s| {
            let members = s.raw_contacts_for_contact(contact_id)?;
            if members.is_empty() {
                return Err(AggregationError::ContactNotFound(contact_id));
            }

            let mut matcher = ContactMatcher::new(&self.config);
            matcher.keep_out(contact_id);
            for member in &members {
                for link in s.exceptions_for_raw_contact(member.id)? {
                    if let (ExceptionKind::KeepOut, Some(other)) = (link.kind, link.other_contact_id) {
                        matcher.keep_out(other);
                    }
                }
            }

            for member in &members {
                let rows = data_rows(s, member.id)?;
                let entries = name_lookup_entries(&self.builder(), member.id, &rows);
                let candidates = MatchCandidateList::from_entries(&entries);
                self.match_names(s, member.id, &candidates, &mut matcher)?;
                self.match_data(s, member.id, &rows, &mut matcher)?;
            }

            Ok(matcher.pick_best_matches(limit, self.config.suggest_threshold))
        })
    }

    /// Stores a user override and re-aggregates both raw contacts so it
    /// takes effect immediately.
    pub fn set_aggregation_exception(
        &self,
        storage: &Storage,
        kind: ExceptionKind,
        raw_contact_id_1: i64,
        raw_contact_id_2: i64,
    ) -> AggregationResult<()> {
        let exception = AggregationException::new(kind, raw_contact_id_1, raw_contact_id_2)
            .map_err(invalid_exception)?;

        storage.with_transaction(|s| {
            s.set_exception(&exception).map_err(invalid_exception)?;

            let mut modes = Vec::with_capacity(2);
            for id in [exception.raw_contact_id_1(), exception.raw_contact_id_2()] {
                modes.push((id, self.mark(s, id)?));
            }
            for (id, mode) in modes {
                if mode != AggregationMode::Disabled {
                    self.aggregate(s, id)?;
                }
            }

            info!(
                "Aggregation exception {:?} set between raw contacts {} and {}",
                kind,
                exception.raw_contact_id_1(),
                exception.raw_contact_id_2()
            );
            Ok(())
        })
    }

    /// Hook for a new raw contact: IMMEDIATE raw contacts are aggregated
    /// synchronously, the rest wait for the next batch pass.
    pub fn on_raw_contact_inserted(
        &self,
        storage: &Storage,
        raw_contact_id: i64,
    ) -> AggregationResult<Option<i64>> {
        let raw = load_raw_contact(storage, raw_contact_id)?;
        match raw.aggregation_mode {
            AggregationMode::Immediate => self.aggregate_contact(storage, raw_contact_id),
            _ => Ok(None),
        }
    }

    /// Hook for changed matching data: re-aggregates IMMEDIATE raw contacts
    /// and leaves DEFAULT ones pending. Returns the raw contact's mode.
    pub fn on_raw_contact_changed(
        &self,
        storage: &Storage,
        raw_contact_id: i64,
    ) -> AggregationResult<AggregationMode> {
        storage.with_transaction(|s| {
            let mode = self.mark(s, raw_contact_id)?;
            if mode == AggregationMode::Immediate {
                self.aggregate(s, raw_contact_id)?;
            }
            Ok(mode)
        })
    }

    /// Deletes a raw contact and refreshes the aggregate it leaves.
    pub fn delete_raw_contact(&self, storage: &Storage, raw_contact_id: i64) -> AggregationResult<()> {
        storage.with_transaction(|s| {
            let former = s.delete_raw_contact(raw_contact_id).map_err(|e| match e {
                StorageError::NotFound(_) => AggregationError::RawContactNotFound(raw_contact_id),
                other => other.into(),
            })?;
            if let Some(contact_id) = former {
                if s.load_contact(contact_id)?.is_some() {
                    self.update_aggregate_data(s, contact_id)?;
                }
            }
            Ok(())
        })
    }

    /// Resolves a lookup key string to an aggregate.
    pub fn lookup_contact(&self, storage: &Storage, lookup_key: &str) -> AggregationResult<Option<i64>> {
        let key = ContactLookupKey::parse(lookup_key)?;
        Ok(storage.contact_id_for_lookup_key(&key)?)
    }
}

/// Orders raw contacts by content: normalized display name, then their sorted
/// matching values. The id only breaks ties between identical raw contacts.
pub fn canonical_order(storage: &Storage, raw_contact_ids: Vec<i64>) -> AggregationResult<Vec<i64>> {
    let mut keyed = Vec::with_capacity(raw_contact_ids.len());
    for raw_contact_id in raw_contact_ids {
        let Some(raw) = storage.load_raw_contact(raw_contact_id)? else {
            continue;
        };
        let name = normalize(raw.display_name.as_deref().unwrap_or_default());
        let mut values: Vec<(&'static str, String)> = data_rows(storage, raw_contact_id)?
            .iter()
            .filter_map(|row| storage.matching_value(row).map(|value| (row.mime_type(), value)))
            .collect();
        values.sort();
        keyed.push(((name, values, raw_contact_id), raw_contact_id));
    }
    keyed.sort();
    Ok(keyed.into_iter().map(|(_, raw_contact_id)| raw_contact_id).collect())
}

fn load_raw_contact(storage: &Storage, raw_contact_id: i64) -> AggregationResult<RawContact> {
    storage
        .load_raw_contact(raw_contact_id)?
        .ok_or(AggregationError::RawContactNotFound(raw_contact_id))
}

fn data_rows(storage: &Storage, raw_contact_id: i64) -> AggregationResult<Vec<DataRow>> {
    Ok(storage
        .data_for_raw_contact(raw_contact_id)?
        .into_iter()
        .map(|record| record.row)
        .collect())
}

fn invalid_exception(e: StorageError) -> AggregationError {
    match e {
        StorageError::InvalidArgument(message) => AggregationError::InvalidException(message),
        other => AggregationError::Storage(other),
    }
}
