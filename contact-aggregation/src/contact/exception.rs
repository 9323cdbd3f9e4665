// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! User overrides that force two raw contacts together or apart.

use crate::storage::StorageError;

/// Kind of aggregation override. The discriminant is the stored code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// The two raw contacts always belong to the same aggregate.
    KeepIn = 1,
    /// The two raw contacts never belong to the same aggregate.
    KeepOut = 2,
}

impl ExceptionKind {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ExceptionKind::KeepIn),
            2 => Some(ExceptionKind::KeepOut),
            _ => None,
        }
    }
}

/// An override between two distinct raw contacts, smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregationException {
    kind: ExceptionKind,
    raw_contact_id_1: i64,
    raw_contact_id_2: i64,
}

impl AggregationException {
    /// Creates an override. A raw contact cannot have an override with itself.
    pub fn new(kind: ExceptionKind, a: i64, b: i64) -> Result<Self, StorageError> {
        if a == b {
            return Err(StorageError::InvalidArgument(format!(
                "aggregation exception needs two distinct raw contacts, got {} twice",
                a
            )));
        }
        Ok(AggregationException {
            kind,
            raw_contact_id_1: a.min(b),
            raw_contact_id_2: a.max(b),
        })
    }

    pub fn kind(&self) -> ExceptionKind {
        self.kind
    }

    pub fn raw_contact_id_1(&self) -> i64 {
        self.raw_contact_id_1
    }

    pub fn raw_contact_id_2(&self) -> i64 {
        self.raw_contact_id_2
    }
}

/// An override seen from one raw contact, with the other side's aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionLink {
    pub kind: ExceptionKind,
    pub other_raw_contact_id: i64,
    /// Aggregate of the other raw contact, if it is aggregated.
    pub other_contact_id: Option<i64>,
}
