// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Shared fixtures for building stores populated with raw contacts.

#![allow(dead_code)]

pub mod strategies;

use std::sync::Once;

use contact_aggregation::*;

/// Installs a log subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn create_test_storage() -> Storage {
    init_tracing();
    Storage::in_memory().unwrap()
}

/// A person as it might arrive from one source.
#[derive(Debug, Clone, Default)]
pub struct Person {
    pub name: Option<String>,
    pub phones: Vec<String>,
    pub emails: Vec<String>,
    pub nicknames: Vec<String>,
}

impl Person {
    pub fn named(name: &str) -> Self {
        Person {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn phone(mut self, number: &str) -> Self {
        self.phones.push(number.to_string());
        self
    }

    pub fn email(mut self, address: &str) -> Self {
        self.emails.push(address.to_string());
        self
    }

    pub fn nickname(mut self, nickname: &str) -> Self {
        self.nicknames.push(nickname.to_string());
        self
    }
}

/// Inserts a raw contact with its data rows; returns its id.
pub fn insert_person(storage: &Storage, raw: NewRawContact, person: &Person) -> i64 {
    let id = storage.insert_raw_contact(&raw).unwrap();
    if let Some(name) = &person.name {
        storage.insert_data(id, &DataRow::structured_name(name)).unwrap();
    }
    for phone in &person.phones {
        storage.insert_data(id, &DataRow::phone(phone)).unwrap();
    }
    for email in &person.emails {
        storage.insert_data(id, &DataRow::email(email)).unwrap();
    }
    for nickname in &person.nicknames {
        storage.insert_data(id, &DataRow::nickname(nickname)).unwrap();
    }
    id
}

/// Inserts a local DEFAULT-mode raw contact.
pub fn insert_local(storage: &Storage, person: &Person) -> i64 {
    insert_person(storage, NewRawContact::local(), person)
}

/// Inserts and aggregates a raw contact; returns `(raw_contact_id, contact_id)`.
pub fn insert_aggregated(
    storage: &Storage,
    aggregator: &ContactAggregator,
    person: &Person,
) -> (i64, i64) {
    let raw_id = insert_local(storage, person);
    let contact_id = aggregator.aggregate_contact(storage, raw_id).unwrap().unwrap();
    (raw_id, contact_id)
}

pub fn contact_of(storage: &Storage, raw_contact_id: i64) -> Option<i64> {
    storage.get_raw_contact(raw_contact_id).unwrap().contact_id
}
