// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact Aggregation Library
//!
//! Merges raw contacts from many sources into contact aggregates: name
//! normalization and lookup variants, fuzzy match scoring, stable lookup
//! keys and a debounced background pass scheduler over a SQLite store.

pub mod aggregation;
pub mod config;
pub mod contact;
pub mod error;
pub mod name;
pub mod phone;
pub mod raw_contact;
pub mod storage;

pub use aggregation::{
    canonical_order, AggregationOutcome, AggregationPass, AggregationScheduler, CancellationToken,
    ContactAggregator, ContactMatcher, MatchScore, PassSummary, ScoreTable, SchedulerStatus,
    StorePass,
};
pub use config::{AggregationConfig, SchedulerConfig};
pub use contact::{
    AggregateFields, AggregateMember, AggregationException, Contact, ContactLookupKey,
    ExceptionKind, ExceptionLink, LookupKeyError, LookupKeySegment, LookupKeyType,
};
pub use error::{AggregationError, AggregationResult};
pub use name::{
    compare_complexity, normalize, Name, NameDistance, NameLookupBuilder, NameLookupEntry,
    NameLookupType, NameSplitter, NameStyle, NicknameClusters, NicknameTable,
};
pub use phone::{DigitsPhoneNormalizer, PhoneNormalizer};
pub use raw_contact::{
    Account, AggregationMode, DataRecord, DataRow, DisplayNameSource, NewRawContact, RawContact,
    RawContactOptions, StructuredName,
};
pub use storage::{NameMatch, Storage, StorageError};
