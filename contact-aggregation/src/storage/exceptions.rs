// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Aggregation exception storage operations.

use rusqlite::params;

use super::{Storage, StorageError};
use crate::contact::{AggregationException, ExceptionKind, ExceptionLink};

impl Storage {
    // === Aggregation Exception Operations ===

    /// Stores an override, replacing any previous one for the same pair.
    ///
    /// Both raw contacts must exist.
    pub fn set_exception(&self, exception: &AggregationException) -> Result<(), StorageError> {
        for id in [exception.raw_contact_id_1(), exception.raw_contact_id_2()] {
            if self.load_raw_contact(id)?.is_none() {
                return Err(StorageError::InvalidArgument(format!(
                    "aggregation exception references unknown raw contact {}",
                    id
                )));
            }
        }

        self.conn.execute(
            "INSERT INTO agg_exceptions (kind, raw_contact_id1, raw_contact_id2)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (raw_contact_id1, raw_contact_id2) DO UPDATE SET kind = excluded.kind",
            params![
                exception.kind().code(),
                exception.raw_contact_id_1(),
                exception.raw_contact_id_2()
            ],
        )?;
        Ok(())
    }

    /// Removes the override between two raw contacts. Returns whether one existed.
    pub fn clear_exception(&self, a: i64, b: i64) -> Result<bool, StorageError> {
        let deleted = self.conn.execute(
            "DELETE FROM agg_exceptions WHERE raw_contact_id1 = ?1 AND raw_contact_id2 = ?2",
            params![a.min(b), a.max(b)],
        )?;
        Ok(deleted > 0)
    }

    /// Overrides touching a raw contact, seen from its side.
    pub fn exceptions_for_raw_contact(
        &self,
        raw_contact_id: i64,
    ) -> Result<Vec<ExceptionLink>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT e.kind, r.id, r.contact_id FROM agg_exceptions e
             JOIN raw_contacts r ON r.id = CASE
                 WHEN e.raw_contact_id1 = ?1 THEN e.raw_contact_id2
                 ELSE e.raw_contact_id1 END
             WHERE e.raw_contact_id1 = ?1 OR e.raw_contact_id2 = ?1
             ORDER BY r.id",
        )?;
        let rows = stmt
            .query_map([raw_contact_id], |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(code, other_raw_contact_id, other_contact_id)| {
                let kind = ExceptionKind::from_code(code).ok_or_else(|| {
                    StorageError::Corrupt(format!("aggregation exception kind {}", code))
                })?;
                Ok(ExceptionLink {
                    kind,
                    other_raw_contact_id,
                    other_contact_id,
                })
            })
            .collect()
    }

    /// All stored overrides, ordered by pair.
    pub fn list_exceptions(&self) -> Result<Vec<AggregationException>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, raw_contact_id1, raw_contact_id2 FROM agg_exceptions
             ORDER BY raw_contact_id1, raw_contact_id2",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(code, a, b)| {
                let kind = ExceptionKind::from_code(code).ok_or_else(|| {
                    StorageError::Corrupt(format!("aggregation exception kind {}", code))
                })?;
                AggregationException::new(kind, a, b)
            })
            .collect()
    }
}
