// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact aggregate storage operations.

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension, Row};

use super::raw_contacts::{RawContactRow, RAW_CONTACT_COLUMNS};
use super::{Storage, StorageError};
use crate::contact::lookup_key::account_hash;
use crate::contact::{AggregateFields, AggregateMember, Contact, ContactLookupKey, LookupKeyType};
use crate::name::normalize;

const CONTACT_COLUMNS: &str = "id, display_name, name_raw_contact_id, photo_id, custom_ringtone,
     send_to_voicemail, last_time_contacted, times_contacted, starred, has_phone_number,
     single_is_restricted, lookup_key";

fn row_to_contact(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        fields: AggregateFields {
            display_name: row.get(1)?,
            name_raw_contact_id: row.get(2)?,
            photo_id: row.get(3)?,
            custom_ringtone: row.get(4)?,
            send_to_voicemail: row.get(5)?,
            last_time_contacted: row.get(6)?,
            times_contacted: row.get(7)?,
            starred: row.get(8)?,
            has_phone_number: row.get(9)?,
            single_is_restricted: row.get(10)?,
            lookup_key: row.get(11)?,
        },
    })
}

impl Storage {
    // === Contact Operations ===

    /// Creates an aggregate with no members and empty fields.
    pub fn insert_contact(&self) -> Result<i64, StorageError> {
        self.conn.execute("INSERT INTO contacts DEFAULT VALUES", [])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Loads a contact by ID.
    pub fn load_contact(&self, id: i64) -> Result<Option<Contact>, StorageError> {
        let contact = self
            .conn
            .query_row(
                &format!("SELECT {} FROM contacts WHERE id = ?1", CONTACT_COLUMNS),
                [id],
                row_to_contact,
            )
            .optional()?;
        Ok(contact)
    }

    /// Lists all contacts in id order.
    pub fn list_contacts(&self) -> Result<Vec<Contact>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM contacts ORDER BY id", CONTACT_COLUMNS))?;
        let contacts = stmt
            .query_map([], row_to_contact)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(contacts)
    }

    pub fn contact_count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Stores recomputed aggregate fields.
    pub fn update_contact_fields(
        &self,
        id: i64,
        fields: &AggregateFields,
    ) -> Result<(), StorageError> {
        let updated = self.conn.execute(
            "UPDATE contacts SET display_name = ?2, name_raw_contact_id = ?3, photo_id = ?4,
                 custom_ringtone = ?5, send_to_voicemail = ?6, last_time_contacted = ?7,
                 times_contacted = ?8, starred = ?9, has_phone_number = ?10,
                 single_is_restricted = ?11, lookup_key = ?12
             WHERE id = ?1",
            params![
                id,
                fields.display_name,
                fields.name_raw_contact_id,
                fields.photo_id,
                fields.custom_ringtone,
                fields.send_to_voicemail,
                fields.last_time_contacted,
                fields.times_contacted,
                fields.starred,
                fields.has_phone_number,
                fields.single_is_restricted,
                fields.lookup_key,
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("contact {}", id)));
        }
        Ok(())
    }

    pub fn contact_member_count(&self, id: i64) -> Result<usize, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM raw_contacts WHERE contact_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Deletes an aggregate that has no members left.
    pub fn delete_contact_if_empty(&self, id: i64) -> Result<bool, StorageError> {
        let deleted = self.conn.execute(
            "DELETE FROM contacts WHERE id = ?1
             AND NOT EXISTS (SELECT 1 FROM raw_contacts WHERE contact_id = ?1)",
            [id],
        )?;
        Ok(deleted > 0)
    }

    /// Members of an aggregate with the data the field reduction needs.
    pub fn aggregate_members(&self, id: i64) -> Result<Vec<AggregateMember>, StorageError> {
        self.raw_contacts_for_contact(id)?
            .into_iter()
            .map(|raw_contact| {
                Ok(AggregateMember {
                    photo_data_id: self.photo_data_id(raw_contact.id)?,
                    has_phone_number: self.has_phone_number(raw_contact.id)?,
                    raw_contact,
                })
            })
            .collect()
    }

    /// Resolves a lookup key to the aggregate holding most of its members.
    ///
    /// Ties go to the aggregate whose member appears first in the key.
    pub fn contact_id_for_lookup_key(
        &self,
        lookup_key: &ContactLookupKey,
    ) -> Result<Option<i64>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM raw_contacts WHERE contact_id IS NOT NULL ORDER BY id",
            RAW_CONTACT_COLUMNS
        ))?;
        let raw_contacts = stmt
            .query_map([], RawContactRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(RawContactRow::into_raw_contact)
            .collect::<Result<Vec<_>, _>>()?;

        let mut votes: HashMap<i64, usize> = HashMap::new();
        let mut first_seen: Vec<i64> = Vec::new();

        for segment in lookup_key.segments() {
            let hit = raw_contacts.iter().find(|raw| {
                account_hash(raw.account_type(), raw.account_name()) == segment.account_hash
                    && match segment.key_type {
                        LookupKeyType::SourceId => {
                            raw.source_id.as_deref() == Some(segment.key.as_str())
                        }
                        LookupKeyType::DisplayName => {
                            raw.source_id.is_none()
                                && normalize(raw.display_name.as_deref().unwrap_or_default())
                                    == segment.key
                        }
                    }
            });
            if let Some(contact_id) = hit.and_then(|raw| raw.contact_id) {
                let count = votes.entry(contact_id).or_insert(0);
                if *count == 0 {
                    first_seen.push(contact_id);
                }
                *count += 1;
            }
        }

        let best = first_seen
            .iter()
            .copied()
            .fold(None, |best: Option<(i64, usize)>, id| {
                let count = votes.get(&id).copied().unwrap_or_default();
                match best {
                    Some((_, best_count)) if best_count >= count => best,
                    _ => Some((id, count)),
                }
            });
        Ok(best.map(|(id, _)| id))
    }
}
