// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent Storage Module
//!
//! SQLite record store for raw contacts, their data rows, contact aggregates,
//! the name lookup index and aggregation exceptions.
//!
//! Operations are split by table across submodules, each adding methods to
//! [`Storage`]. Referential cleanup (data rows, lookup rows and exceptions of
//! a deleted raw contact) is done by foreign key cascades.

mod contacts;
mod data;
mod error;
mod exceptions;
mod name_lookup;
mod raw_contacts;

pub mod migration;

pub use error::StorageError;
pub use name_lookup::NameMatch;

use std::path::Path;

use rusqlite::Connection;
use tracing::warn;

use crate::name::NameSplitter;
use crate::phone::{DigitsPhoneNormalizer, PhoneNormalizer};

/// SQLite-based record store.
pub struct Storage {
    conn: Connection,
    phone: Box<dyn PhoneNormalizer>,
    splitter: NameSplitter,
}

impl Storage {
    /// Opens or creates a storage database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Creates an in-memory storage (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let storage = Storage {
            conn,
            phone: Box::new(DigitsPhoneNormalizer),
            splitter: NameSplitter::english(),
        };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Replaces the phone normalizer used for newly written phone rows.
    pub fn with_phone_normalizer(mut self, phone: Box<dyn PhoneNormalizer>) -> Self {
        self.phone = phone;
        self
    }

    /// Replaces the splitter used to complete structured names.
    pub fn with_name_splitter(mut self, splitter: NameSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn phone_normalizer(&self) -> &dyn PhoneNormalizer {
        self.phone.as_ref()
    }

    pub fn name_splitter(&self) -> &NameSplitter {
        &self.splitter
    }

    /// Runs all pending schema migrations.
    fn run_migrations(&self) -> Result<(), StorageError> {
        let migrations = migration::all_migrations();
        migration::MigrationRunner::run(&self.conn, &migrations)
    }

    /// Returns the current schema version.
    pub fn schema_version(&self) -> Result<u32, StorageError> {
        migration::MigrationRunner::current_version(&self.conn)
    }

    // === Transactions ===

    /// Whether a transaction is open on the connection.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    pub fn begin(&self) -> Result<(), StorageError> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        Ok(())
    }

    pub fn commit(&self) -> Result<(), StorageError> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    pub fn rollback(&self) -> Result<(), StorageError> {
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }

    /// Runs `f` inside a write transaction, committing on success and rolling
    /// back on error. Joins the enclosing transaction if one is already open.
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Storage) -> Result<T, E>,
        E: From<StorageError>,
    {
        self.transaction("BEGIN IMMEDIATE TRANSACTION;", f)
    }

    /// Like [`with_transaction`](Self::with_transaction) but only takes a
    /// write lock once `f` writes.
    pub fn with_read_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Storage) -> Result<T, E>,
        E: From<StorageError>,
    {
        self.transaction("BEGIN DEFERRED TRANSACTION;", f)
    }

    fn transaction<T, E, F>(&self, begin: &str, f: F) -> Result<T, E>
    where
        F: FnOnce(&Storage) -> Result<T, E>,
        E: From<StorageError>,
    {
        if self.in_transaction() {
            return f(self);
        }

        self.conn.execute_batch(begin).map_err(StorageError::from)?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = self.rollback() {
                    warn!("Rollback failed: {}", rollback_error);
                }
                Err(e)
            }
        }
    }
}
