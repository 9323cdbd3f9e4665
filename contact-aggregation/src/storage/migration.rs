// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Database Schema Migration Framework
//!
//! Versioned schema migrations tracked in a `schema_version` table. Pending
//! migrations run in order within a single exclusive transaction.

use rusqlite::Connection;

use super::StorageError;

/// A single schema migration step.
pub struct Migration {
    /// Monotonically increasing version number (starting at 1).
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Runs schema migrations against a database connection.
pub struct MigrationRunner;

impl MigrationRunner {
    /// Applies every migration newer than the current schema version.
    ///
    /// If any migration fails, all of them are rolled back.
    pub fn run(conn: &Connection, migrations: &[Migration]) -> Result<(), StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            );",
        )?;

        let current_version = Self::current_version(conn)?;
        let pending: Vec<&Migration> = migrations
            .iter()
            .filter(|m| m.version > current_version)
            .collect();

        if pending.is_empty() {
            return Ok(());
        }

        for window in pending.windows(2) {
            if window[0].version >= window[1].version {
                return Err(StorageError::Migration(format!(
                    "Migrations are not in order: v{} before v{}",
                    window[0].version, window[1].version
                )));
            }
        }

        conn.execute_batch("BEGIN EXCLUSIVE TRANSACTION;")?;

        for migration in &pending {
            if let Err(e) = conn.execute_batch(migration.sql) {
                conn.execute_batch("ROLLBACK;")?;
                return Err(StorageError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e
                )));
            }

            if let Err(e) = conn.execute(
                "INSERT INTO schema_version (version, applied_at)
                 VALUES (?1, CAST(strftime('%s', 'now') AS INTEGER))",
                [migration.version],
            ) {
                conn.execute_batch("ROLLBACK;")?;
                return Err(StorageError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e
                )));
            }
        }

        conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    /// Returns the current schema version, or 0 if no migrations have been applied.
    pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
        let table_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        let version: Option<u32> =
            conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })?;

        Ok(version.unwrap_or(0))
    }
}

/// Returns all registered migrations in version order.
pub fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "aggregation_schema",
            sql: "
            CREATE TABLE contacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                display_name TEXT,
                name_raw_contact_id INTEGER,
                photo_id INTEGER,
                custom_ringtone TEXT,
                send_to_voicemail INTEGER NOT NULL DEFAULT 0,
                last_time_contacted INTEGER,
                times_contacted INTEGER NOT NULL DEFAULT 0,
                starred INTEGER NOT NULL DEFAULT 0,
                has_phone_number INTEGER NOT NULL DEFAULT 0,
                single_is_restricted INTEGER NOT NULL DEFAULT 0,
                lookup_key TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE raw_contacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_type TEXT,
                account_name TEXT,
                source_id TEXT,
                contact_id INTEGER REFERENCES contacts(id) ON DELETE SET NULL,
                aggregation_mode INTEGER NOT NULL DEFAULT 0,
                is_restricted INTEGER NOT NULL DEFAULT 0,
                display_name TEXT,
                display_name_source INTEGER NOT NULL DEFAULT 0,
                starred INTEGER NOT NULL DEFAULT 0,
                send_to_voicemail INTEGER NOT NULL DEFAULT 0,
                custom_ringtone TEXT,
                last_time_contacted INTEGER,
                times_contacted INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX raw_contacts_contact_id_index ON raw_contacts(contact_id);
            CREATE INDEX raw_contacts_source_id_index ON raw_contacts(source_id);

            CREATE TABLE data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                raw_contact_id INTEGER NOT NULL REFERENCES raw_contacts(id) ON DELETE CASCADE,
                mimetype TEXT NOT NULL,
                data1 TEXT,
                data2 TEXT,
                data3 TEXT,
                data4 TEXT,
                data5 TEXT,
                data6 TEXT,
                normalized TEXT
            );
            CREATE INDEX data_raw_contact_id_index ON data(raw_contact_id);
            CREATE INDEX data_normalized_index ON data(mimetype, normalized);

            CREATE TABLE name_lookup (
                raw_contact_id INTEGER NOT NULL REFERENCES raw_contacts(id) ON DELETE CASCADE,
                normalized_name TEXT NOT NULL,
                name_type INTEGER NOT NULL,
                PRIMARY KEY (raw_contact_id, normalized_name, name_type)
            );
            CREATE INDEX name_lookup_index ON name_lookup(normalized_name, name_type, raw_contact_id);

            CREATE TABLE agg_exceptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind INTEGER NOT NULL,
                raw_contact_id1 INTEGER NOT NULL REFERENCES raw_contacts(id) ON DELETE CASCADE,
                raw_contact_id2 INTEGER NOT NULL REFERENCES raw_contacts(id) ON DELETE CASCADE,
                UNIQUE (raw_contact_id1, raw_contact_id2)
            );
            CREATE INDEX agg_exceptions_raw_contact_id2_index ON agg_exceptions(raw_contact_id2);
            ",
        },
    ]
}
