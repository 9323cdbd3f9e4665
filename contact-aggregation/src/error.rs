// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Aggregation Error Types
//!
//! Unified error type for the aggregation engine.

use thiserror::Error;

use crate::contact::LookupKeyError;
use crate::storage::StorageError;

/// Unified error type for aggregation operations.
#[derive(Error, Debug)]
pub enum AggregationError {
    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Lookup key could not be parsed.
    #[error("lookup key error: {0}")]
    LookupKey(#[from] LookupKeyError),

    #[error("raw contact not found: {0}")]
    RawContactNotFound(i64),

    #[error("contact not found: {0}")]
    ContactNotFound(i64),

    /// Aggregation exception rejected by the store.
    #[error("invalid aggregation exception: {0}")]
    InvalidException(String),

    /// The store returned something that cannot happen.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The scheduler worker thread could not be started.
    #[error("worker error: {0}")]
    Worker(#[from] std::io::Error),
}

pub type AggregationResult<T> = Result<T, AggregationError>;
