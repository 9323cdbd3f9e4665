// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Data row storage operations.
//!
//! Rows are stored in a generic `data1..data6` layout keyed by mime type.
//! The `normalized` column holds the value compared during matching.

use rusqlite::{params, OptionalExtension, Row};

use super::{Storage, StorageError};
use crate::name::normalize;
use crate::raw_contact::data::{
    MIME_EMAIL, MIME_GROUP_MEMBERSHIP, MIME_NICKNAME, MIME_PHONE, MIME_PHOTO, MIME_POSTAL,
    MIME_STRUCTURED_NAME,
};
use crate::raw_contact::{DataRecord, DataRow, StructuredName};

/// Column values of one stored data row.
#[derive(Default)]
struct DataColumns {
    data: [Option<String>; 6],
    normalized: Option<String>,
}

impl DataColumns {
    fn with(mut self, index: usize, value: Option<String>) -> Self {
        self.data[index] = value;
        self
    }
}

/// Internal struct for database row data.
struct DataRowColumns {
    id: i64,
    raw_contact_id: i64,
    mimetype: String,
    data: [Option<String>; 6],
}

impl DataRowColumns {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(DataRowColumns {
            id: row.get(0)?,
            raw_contact_id: row.get(1)?,
            mimetype: row.get(2)?,
            data: [
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
            ],
        })
    }

    fn into_record(self) -> Result<DataRecord, StorageError> {
        let [d1, d2, d3, d4, d5, d6] = self.data;
        let required = |value: Option<String>| {
            value.ok_or_else(|| StorageError::Corrupt(format!("data row {} is empty", self.id)))
        };

        let row = match self.mimetype.as_str() {
            MIME_STRUCTURED_NAME => DataRow::StructuredName(StructuredName {
                display_name: d1,
                given: d2,
                family: d3,
                prefix: d4,
                middle: d5,
                suffix: d6,
            }),
            MIME_PHONE => DataRow::Phone {
                number: required(d1)?,
            },
            MIME_EMAIL => DataRow::Email {
                address: required(d1)?,
            },
            MIME_NICKNAME => DataRow::Nickname {
                name: required(d1)?,
            },
            MIME_PHOTO => DataRow::Photo {
                reference: required(d1)?,
            },
            MIME_POSTAL => DataRow::Postal {
                address: required(d1)?,
            },
            MIME_GROUP_MEMBERSHIP => {
                let group_id = required(d1)?;
                DataRow::GroupMembership {
                    group_id: group_id.parse().map_err(|_| {
                        StorageError::Corrupt(format!(
                            "data row {} has group id {:?}",
                            self.id, group_id
                        ))
                    })?,
                }
            }
            other => {
                return Err(StorageError::Corrupt(format!(
                    "data row {} has unknown mime type {}",
                    self.id, other
                )))
            }
        };

        Ok(DataRecord {
            id: self.id,
            raw_contact_id: self.raw_contact_id,
            row,
        })
    }
}

impl Storage {
    // === Data Operations ===

    /// Inserts a data row and refreshes the raw contact's display name.
    ///
    /// Structured names are completed before storing.
    pub fn insert_data(&self, raw_contact_id: i64, row: &DataRow) -> Result<i64, StorageError> {
        // Surfaces NotFound instead of a foreign key failure
        self.get_raw_contact(raw_contact_id)?;

        let row = self.complete(row);
        let columns = self.columns_for(&row);
        let [d1, d2, d3, d4, d5, d6] = &columns.data;
        self.conn.execute(
            "INSERT INTO data
             (raw_contact_id, mimetype, data1, data2, data3, data4, data5, data6, normalized)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                raw_contact_id,
                row.mime_type(),
                d1,
                d2,
                d3,
                d4,
                d5,
                d6,
                columns.normalized
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.refresh_raw_display_name(raw_contact_id)?;
        Ok(id)
    }

    /// Replaces the content of a data row. The mime type may change.
    ///
    /// Returns the owning raw contact.
    pub fn update_data(&self, data_id: i64, row: &DataRow) -> Result<i64, StorageError> {
        let raw_contact_id = self.raw_contact_for_data(data_id)?;
        let row = self.complete(row);
        let columns = self.columns_for(&row);
        let [d1, d2, d3, d4, d5, d6] = &columns.data;
        self.conn.execute(
            "UPDATE data SET mimetype = ?2, data1 = ?3, data2 = ?4, data3 = ?5, data4 = ?6,
                 data5 = ?7, data6 = ?8, normalized = ?9
             WHERE id = ?1",
            params![
                data_id,
                row.mime_type(),
                d1,
                d2,
                d3,
                d4,
                d5,
                d6,
                columns.normalized
            ],
        )?;
        self.refresh_raw_display_name(raw_contact_id)?;
        Ok(raw_contact_id)
    }

    /// Deletes a data row. Returns the owning raw contact.
    pub fn delete_data(&self, data_id: i64) -> Result<i64, StorageError> {
        let raw_contact_id = self.raw_contact_for_data(data_id)?;
        self.conn.execute("DELETE FROM data WHERE id = ?1", [data_id])?;
        self.refresh_raw_display_name(raw_contact_id)?;
        Ok(raw_contact_id)
    }

    /// Loads one data row.
    pub fn load_data(&self, data_id: i64) -> Result<Option<DataRecord>, StorageError> {
        let columns = self
            .conn
            .query_row(
                "SELECT id, raw_contact_id, mimetype, data1, data2, data3, data4, data5, data6
                 FROM data WHERE id = ?1",
                [data_id],
                DataRowColumns::from_row,
            )
            .optional()?;
        columns.map(DataRowColumns::into_record).transpose()
    }

    /// All data rows of a raw contact, in insertion order.
    pub fn data_for_raw_contact(&self, raw_contact_id: i64) -> Result<Vec<DataRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, raw_contact_id, mimetype, data1, data2, data3, data4, data5, data6
             FROM data WHERE raw_contact_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([raw_contact_id], DataRowColumns::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(DataRowColumns::into_record).collect()
    }

    /// First photo row of a raw contact.
    pub fn photo_data_id(&self, raw_contact_id: i64) -> Result<Option<i64>, StorageError> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM data WHERE raw_contact_id = ?1 AND mimetype = ?2
                 ORDER BY id LIMIT 1",
                params![raw_contact_id, MIME_PHOTO],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn has_phone_number(&self, raw_contact_id: i64) -> Result<bool, StorageError> {
        let has: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM data WHERE raw_contact_id = ?1 AND mimetype = ?2)",
            params![raw_contact_id, MIME_PHONE],
            |row| row.get(0),
        )?;
        Ok(has)
    }

    /// Aggregates owning a row of `mime_type` whose matching value equals
    /// `normalized`, excluding `exclude_raw_contact_id`. One entry per
    /// matching raw contact, ordered by aggregate then raw contact.
    pub fn find_aggregates_by_data(
        &self,
        mime_type: &str,
        normalized: &str,
        exclude_raw_contact_id: i64,
    ) -> Result<Vec<i64>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT r.contact_id, r.id FROM data d
             JOIN raw_contacts r ON r.id = d.raw_contact_id
             WHERE d.mimetype = ?1 AND d.normalized = ?2
               AND r.contact_id IS NOT NULL AND r.id != ?3
             ORDER BY r.contact_id, r.id",
        )?;
        let ids = stmt
            .query_map(params![mime_type, normalized, exclude_raw_contact_id], |row| {
                row.get(0)
            })?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// The value compared during matching for a row, if it takes part.
    pub fn matching_value(&self, row: &DataRow) -> Option<String> {
        match row {
            DataRow::Phone { number } => {
                Some(self.phone.min_match(number)).filter(|key| !key.is_empty())
            }
            DataRow::Email { address } => {
                Some(address.trim().to_lowercase()).filter(|key| !key.is_empty())
            }
            DataRow::Nickname { name } => Some(normalize(name)).filter(|key| !key.is_empty()),
            _ => None,
        }
    }

    fn raw_contact_for_data(&self, data_id: i64) -> Result<i64, StorageError> {
        self.conn
            .query_row(
                "SELECT raw_contact_id FROM data WHERE id = ?1",
                [data_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("data row {}", data_id)))
    }

    fn complete(&self, row: &DataRow) -> DataRow {
        match row {
            DataRow::StructuredName(name) => {
                DataRow::StructuredName(name.clone().complete(&self.splitter))
            }
            other => other.clone(),
        }
    }

    fn columns_for(&self, row: &DataRow) -> DataColumns {
        let columns = DataColumns {
            normalized: self.matching_value(row),
            ..DataColumns::default()
        };
        match row {
            DataRow::StructuredName(name) => columns
                .with(0, name.display_name.clone())
                .with(1, name.given.clone())
                .with(2, name.family.clone())
                .with(3, name.prefix.clone())
                .with(4, name.middle.clone())
                .with(5, name.suffix.clone()),
            DataRow::Phone { number } => columns
                .with(0, Some(number.clone()))
                .with(1, Some(self.phone.normalize(number))),
            DataRow::Email { address } => columns.with(0, Some(address.clone())),
            DataRow::Nickname { name } => columns.with(0, Some(name.clone())),
            DataRow::Photo { reference } => columns.with(0, Some(reference.clone())),
            DataRow::Postal { address } => columns.with(0, Some(address.clone())),
            DataRow::GroupMembership { group_id } => columns.with(0, Some(group_id.to_string())),
        }
    }
}
