// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Raw contact storage operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Storage, StorageError};
use crate::raw_contact::{
    display_name_from, Account, AggregationMode, DisplayNameSource, NewRawContact, RawContact,
    RawContactOptions,
};

pub(super) const RAW_CONTACT_COLUMNS: &str = "id, account_type, account_name, source_id, contact_id,
     aggregation_mode, is_restricted, display_name, starred, send_to_voicemail,
     custom_ringtone, last_time_contacted, times_contacted, display_name_source";

/// Internal struct for database row data.
pub(super) struct RawContactRow {
    id: i64,
    account_type: Option<String>,
    account_name: Option<String>,
    source_id: Option<String>,
    contact_id: Option<i64>,
    aggregation_mode: i32,
    is_restricted: bool,
    display_name: Option<String>,
    display_name_source: i32,
    starred: bool,
    send_to_voicemail: bool,
    custom_ringtone: Option<String>,
    last_time_contacted: Option<i64>,
    times_contacted: i64,
}

impl RawContactRow {
    /// Reads a row selected with `RAW_CONTACT_COLUMNS`.
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawContactRow {
            id: row.get(0)?,
            account_type: row.get(1)?,
            account_name: row.get(2)?,
            source_id: row.get(3)?,
            contact_id: row.get(4)?,
            aggregation_mode: row.get(5)?,
            is_restricted: row.get(6)?,
            display_name: row.get(7)?,
            starred: row.get(8)?,
            send_to_voicemail: row.get(9)?,
            custom_ringtone: row.get(10)?,
            last_time_contacted: row.get(11)?,
            times_contacted: row.get(12)?,
            display_name_source: row.get(13)?,
        })
    }

    pub(super) fn into_raw_contact(self) -> Result<RawContact, StorageError> {
        let aggregation_mode = AggregationMode::from_code(self.aggregation_mode).ok_or_else(|| {
            StorageError::Corrupt(format!(
                "raw contact {} has aggregation mode {}",
                self.id, self.aggregation_mode
            ))
        })?;
        let display_name_source =
            DisplayNameSource::from_code(self.display_name_source).ok_or_else(|| {
                StorageError::Corrupt(format!(
                    "raw contact {} has display name source {}",
                    self.id, self.display_name_source
                ))
            })?;
        let account = match (self.account_type, self.account_name) {
            (Some(account_type), Some(account_name)) => Some(Account {
                account_type,
                account_name,
            }),
            _ => None,
        };

        Ok(RawContact {
            id: self.id,
            account,
            source_id: self.source_id,
            contact_id: self.contact_id,
            aggregation_mode,
            is_restricted: self.is_restricted,
            display_name: self.display_name,
            display_name_source,
            options: RawContactOptions {
                starred: self.starred,
                send_to_voicemail: self.send_to_voicemail,
                custom_ringtone: self.custom_ringtone,
                last_time_contacted: self.last_time_contacted,
                times_contacted: self.times_contacted,
            },
        })
    }
}

impl Storage {
    // === Raw Contact Operations ===

    /// Inserts a raw contact, initially not aggregated.
    pub fn insert_raw_contact(&self, raw: &NewRawContact) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO raw_contacts
             (account_type, account_name, source_id, aggregation_mode, is_restricted,
              starred, send_to_voicemail, custom_ringtone, last_time_contacted, times_contacted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                raw.account.as_ref().map(|a| a.account_type.as_str()),
                raw.account.as_ref().map(|a| a.account_name.as_str()),
                raw.source_id,
                raw.aggregation_mode.code(),
                raw.is_restricted,
                raw.options.starred,
                raw.options.send_to_voicemail,
                raw.options.custom_ringtone,
                raw.options.last_time_contacted,
                raw.options.times_contacted,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Loads a raw contact by ID.
    pub fn load_raw_contact(&self, id: i64) -> Result<Option<RawContact>, StorageError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM raw_contacts WHERE id = ?1", RAW_CONTACT_COLUMNS),
                [id],
                RawContactRow::from_row,
            )
            .optional()?;
        row.map(RawContactRow::into_raw_contact).transpose()
    }

    /// Loads a raw contact that must exist.
    pub fn get_raw_contact(&self, id: i64) -> Result<RawContact, StorageError> {
        self.load_raw_contact(id)?
            .ok_or_else(|| StorageError::NotFound(format!("raw contact {}", id)))
    }

    /// Raw contacts waiting for a batch aggregation pass, in id order.
    pub fn pending_raw_contact_ids(&self) -> Result<Vec<i64>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM raw_contacts
             WHERE contact_id IS NULL AND aggregation_mode = ?1
             ORDER BY id",
        )?;
        let ids = stmt
            .query_map([AggregationMode::Default.code()], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Member raw contacts of an aggregate, in id order.
    pub fn raw_contacts_for_contact(&self, contact_id: i64) -> Result<Vec<RawContact>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM raw_contacts WHERE contact_id = ?1 ORDER BY id",
            RAW_CONTACT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([contact_id], RawContactRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawContactRow::into_raw_contact).collect()
    }

    /// Points a raw contact at an aggregate, or detaches it with `None`.
    ///
    /// An aggregate left without members is deleted.
    pub fn set_raw_contact_aggregate(
        &self,
        raw_contact_id: i64,
        contact_id: Option<i64>,
    ) -> Result<(), StorageError> {
        let previous = self.get_raw_contact(raw_contact_id)?.contact_id;
        self.conn.execute(
            "UPDATE raw_contacts SET contact_id = ?2 WHERE id = ?1",
            params![raw_contact_id, contact_id],
        )?;
        if let Some(previous) = previous.filter(|p| Some(*p) != contact_id) {
            self.delete_contact_if_empty(previous)?;
        }
        Ok(())
    }

    pub fn set_aggregation_mode(
        &self,
        raw_contact_id: i64,
        mode: AggregationMode,
    ) -> Result<(), StorageError> {
        let updated = self.conn.execute(
            "UPDATE raw_contacts SET aggregation_mode = ?2 WHERE id = ?1",
            params![raw_contact_id, mode.code()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("raw contact {}", raw_contact_id)));
        }
        Ok(())
    }

    pub fn update_raw_contact_options(
        &self,
        raw_contact_id: i64,
        options: &RawContactOptions,
    ) -> Result<(), StorageError> {
        let updated = self.conn.execute(
            "UPDATE raw_contacts SET starred = ?2, send_to_voicemail = ?3, custom_ringtone = ?4,
                 last_time_contacted = ?5, times_contacted = ?6
             WHERE id = ?1",
            params![
                raw_contact_id,
                options.starred,
                options.send_to_voicemail,
                options.custom_ringtone,
                options.last_time_contacted,
                options.times_contacted,
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("raw contact {}", raw_contact_id)));
        }
        Ok(())
    }

    /// Recomputes the display name of a raw contact from its data rows.
    pub(super) fn refresh_raw_display_name(&self, raw_contact_id: i64) -> Result<(), StorageError> {
        let rows: Vec<_> = self
            .data_for_raw_contact(raw_contact_id)?
            .into_iter()
            .map(|record| record.row)
            .collect();
        let (source, display_name) = match display_name_from(&rows) {
            Some((source, name)) => (source, Some(name)),
            None => (DisplayNameSource::Undefined, None),
        };
        self.conn.execute(
            "UPDATE raw_contacts SET display_name = ?2, display_name_source = ?3 WHERE id = ?1",
            params![raw_contact_id, display_name, source.code()],
        )?;
        Ok(())
    }

    /// Deletes a raw contact with its data, lookup rows and exceptions.
    ///
    /// Returns the aggregate it belonged to, which is deleted if now empty.
    pub fn delete_raw_contact(&self, raw_contact_id: i64) -> Result<Option<i64>, StorageError> {
        let contact_id = self.get_raw_contact(raw_contact_id)?.contact_id;
        self.conn
            .execute("DELETE FROM raw_contacts WHERE id = ?1", [raw_contact_id])?;
        if let Some(contact_id) = contact_id {
            self.delete_contact_if_empty(contact_id)?;
        }
        Ok(contact_id)
    }
}
