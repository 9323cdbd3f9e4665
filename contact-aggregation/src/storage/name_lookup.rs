// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Name lookup index storage operations.

use rusqlite::{params, Row};

use super::{Storage, StorageError};
use crate::name::{NameLookupEntry, NameLookupType};

/// A lookup row found for an aggregated raw contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatch {
    pub contact_id: i64,
    pub raw_contact_id: i64,
    pub name_type: NameLookupType,
    pub normalized_name: String,
}

impl NameMatch {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<(i64, i64, i32, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn from_columns(columns: (i64, i64, i32, String)) -> Result<Self, StorageError> {
        let (contact_id, raw_contact_id, code, normalized_name) = columns;
        let name_type = NameLookupType::from_code(code).ok_or_else(|| {
            StorageError::Corrupt(format!(
                "name lookup row of raw contact {} has type {}",
                raw_contact_id, code
            ))
        })?;
        Ok(NameMatch {
            contact_id,
            raw_contact_id,
            name_type,
            normalized_name,
        })
    }
}

/// `(1, 2, 3)` for an IN clause. Only used with integers.
fn in_list<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    let values: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
    format!("({})", values.join(", "))
}

impl Storage {
    // === Name Lookup Operations ===

    /// Replaces all lookup rows of a raw contact.
    pub fn replace_name_lookups(
        &self,
        raw_contact_id: i64,
        entries: &[NameLookupEntry],
    ) -> Result<(), StorageError> {
        self.delete_name_lookups(raw_contact_id)?;
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO name_lookup (raw_contact_id, normalized_name, name_type)
             VALUES (?1, ?2, ?3)",
        )?;
        for entry in entries {
            stmt.execute(params![
                raw_contact_id,
                entry.normalized_name,
                entry.name_type.code()
            ])?;
        }
        Ok(())
    }

    pub fn delete_name_lookups(&self, raw_contact_id: i64) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM name_lookup WHERE raw_contact_id = ?1",
            [raw_contact_id],
        )?;
        Ok(())
    }

    /// Lookup rows of one raw contact, ordered by type then key.
    pub fn name_lookups_for_raw_contact(
        &self,
        raw_contact_id: i64,
    ) -> Result<Vec<NameLookupEntry>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT normalized_name, name_type FROM name_lookup
             WHERE raw_contact_id = ?1 ORDER BY name_type, normalized_name",
        )?;
        let rows = stmt
            .query_map([raw_contact_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i32>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(normalized_name, code)| {
                let name_type = NameLookupType::from_code(code).ok_or_else(|| {
                    StorageError::Corrupt(format!("name lookup type {}", code))
                })?;
                Ok(NameLookupEntry {
                    raw_contact_id,
                    name_type,
                    normalized_name,
                })
            })
            .collect()
    }

    /// Lookup rows of aggregated raw contacts whose key equals `key`.
    pub fn find_name_matches(
        &self,
        key: &str,
        exclude_raw_contact_id: i64,
    ) -> Result<Vec<NameMatch>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.contact_id, n.raw_contact_id, n.name_type, n.normalized_name
             FROM name_lookup n JOIN raw_contacts r ON r.id = n.raw_contact_id
             WHERE n.normalized_name = ?1
               AND r.contact_id IS NOT NULL AND r.id != ?2
             ORDER BY r.contact_id, n.raw_contact_id, n.name_type",
        )?;
        let rows = stmt
            .query_map(params![key, exclude_raw_contact_id], NameMatch::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(NameMatch::from_columns).collect()
    }

    /// Lookup rows of the given types whose key starts with `prefix`.
    pub fn find_name_prefix_matches(
        &self,
        prefix: &str,
        types: &[NameLookupType],
        exclude_raw_contact_id: i64,
    ) -> Result<Vec<NameMatch>, StorageError> {
        if types.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT r.contact_id, n.raw_contact_id, n.name_type, n.normalized_name
             FROM name_lookup n JOIN raw_contacts r ON r.id = n.raw_contact_id
             WHERE n.normalized_name LIKE ?1 || '%' AND n.name_type IN {}
               AND r.contact_id IS NOT NULL AND r.id != ?2
             ORDER BY r.contact_id, n.raw_contact_id, n.name_type, n.normalized_name",
            in_list(types.iter().map(|t| t.code()))
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![prefix, exclude_raw_contact_id], NameMatch::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(NameMatch::from_columns).collect()
    }

    /// Lookup rows of the given types for all members of the given aggregates.
    pub fn name_lookups_for_contacts(
        &self,
        contact_ids: &[i64],
        types: &[NameLookupType],
    ) -> Result<Vec<NameMatch>, StorageError> {
        if contact_ids.is_empty() || types.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT r.contact_id, n.raw_contact_id, n.name_type, n.normalized_name
             FROM name_lookup n JOIN raw_contacts r ON r.id = n.raw_contact_id
             WHERE r.contact_id IN {} AND n.name_type IN {}
             ORDER BY r.contact_id, n.raw_contact_id, n.name_type, n.normalized_name",
            in_list(contact_ids.iter()),
            in_list(types.iter().map(|t| t.code()))
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], NameMatch::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(NameMatch::from_columns).collect()
    }
}
