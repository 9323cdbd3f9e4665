// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Raw Contact Module
//!
//! A raw contact is one source's record of a person: a single account (or
//! the device-local account) with its own typed data rows. Raw contacts are
//! grouped into aggregates by the aggregation engine.

pub mod data;

pub use data::{display_name_from, DataRecord, DataRow, DisplayNameSource, StructuredName};

/// How a raw contact takes part in aggregation. The discriminant is the stored code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AggregationMode {
    /// Aggregated by the next batch pass.
    #[default]
    Default = 0,
    /// Aggregated synchronously when inserted or changed.
    Immediate = 1,
    /// Never aggregated automatically.
    Disabled = 3,
}

impl AggregationMode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(AggregationMode::Default),
            1 => Some(AggregationMode::Immediate),
            3 => Some(AggregationMode::Disabled),
            _ => None,
        }
    }
}

/// The account a raw contact comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Account {
    pub account_type: String,
    pub account_name: String,
}

impl Account {
    pub fn new(account_type: &str, account_name: &str) -> Self {
        Account {
            account_type: account_type.to_string(),
            account_name: account_name.to_string(),
        }
    }
}

/// Per-record options that are reduced into the aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawContactOptions {
    pub starred: bool,
    pub send_to_voicemail: bool,
    pub custom_ringtone: Option<String>,
    /// Unix timestamp (milliseconds) of the last contact.
    pub last_time_contacted: Option<i64>,
    pub times_contacted: i64,
}

/// A stored raw contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContact {
    pub id: i64,
    /// `None` for the device-local account.
    pub account: Option<Account>,
    pub source_id: Option<String>,
    /// Aggregate this raw contact belongs to; `None` while pending aggregation.
    pub contact_id: Option<i64>,
    pub aggregation_mode: AggregationMode,
    pub is_restricted: bool,
    /// Best display name derived from the data rows.
    pub display_name: Option<String>,
    pub display_name_source: DisplayNameSource,
    pub options: RawContactOptions,
}

impl RawContact {
    pub fn account_type(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.account_type.as_str())
    }

    pub fn account_name(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.account_name.as_str())
    }
}

/// Values for inserting a raw contact.
#[derive(Debug, Clone, Default)]
pub struct NewRawContact {
    pub account: Option<Account>,
    pub source_id: Option<String>,
    pub aggregation_mode: AggregationMode,
    pub is_restricted: bool,
    pub options: RawContactOptions,
}

impl NewRawContact {
    /// A raw contact in the device-local account.
    pub fn local() -> Self {
        Self::default()
    }

    /// A raw contact belonging to a synced account.
    pub fn for_account(account_type: &str, account_name: &str) -> Self {
        NewRawContact {
            account: Some(Account::new(account_type, account_name)),
            ..Self::default()
        }
    }

    pub fn with_source_id(mut self, source_id: &str) -> Self {
        self.source_id = Some(source_id.to_string());
        self
    }

    pub fn with_mode(mut self, mode: AggregationMode) -> Self {
        self.aggregation_mode = mode;
        self
    }

    pub fn with_options(mut self, options: RawContactOptions) -> Self {
        self.options = options;
        self
    }

    pub fn restricted(mut self) -> Self {
        self.is_restricted = true;
        self
    }
}
