// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact Lookup Keys
//!
//! A lookup key addresses an aggregate by the identities of its members, so
//! it keeps resolving after re-aggregation as long as one member survives.
//!
//! Format: segments joined by `.`, each `<accountHash><type><key>`:
//! - `n`: normalized display name
//! - `i`: source id, verbatim
//! - `e`: source id containing `.`, escaped as `..`

use std::fmt;

use thiserror::Error;

use crate::name::normalize;

const SEPARATOR: char = '.';
const TYPE_DISPLAY_NAME: char = 'n';
const TYPE_SOURCE_ID: char = 'i';
const TYPE_ESCAPED_SOURCE_ID: char = 'e';

/// Mask applied to the combined account hash.
const ACCOUNT_HASH_MASK: i32 = 0xFFF;

/// Errors from parsing a lookup key string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupKeyError {
    #[error("Lookup key is empty")]
    Empty,

    #[error("Invalid segment type {found:?} at position {position}")]
    InvalidType { position: usize, found: Option<char> },

    #[error("Account hash at position {0} is out of range")]
    HashOverflow(usize),

    #[error("Lookup key ends with a separator")]
    TrailingSeparator,
}

/// What the key part of a segment identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKeyType {
    /// Normalized display name of a raw contact without source id.
    DisplayName,
    /// Source id assigned by the contributing account.
    SourceId,
}

/// One member's contribution to a lookup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupKeySegment {
    pub account_hash: u32,
    pub key_type: LookupKeyType,
    pub key: String,
}

impl LookupKeySegment {
    /// Segment for a raw contact that has a source id.
    pub fn source_id(account_type: Option<&str>, account_name: Option<&str>, source_id: &str) -> Self {
        LookupKeySegment {
            account_hash: account_hash(account_type, account_name),
            key_type: LookupKeyType::SourceId,
            key: source_id.to_string(),
        }
    }

    /// Segment for a raw contact identified by its display name.
    pub fn display_name(
        account_type: Option<&str>,
        account_name: Option<&str>,
        display_name: &str,
    ) -> Self {
        LookupKeySegment {
            account_hash: account_hash(account_type, account_name),
            key_type: LookupKeyType::DisplayName,
            key: normalize(display_name),
        }
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(&self.account_hash.to_string());
        match self.key_type {
            LookupKeyType::DisplayName => {
                out.push(TYPE_DISPLAY_NAME);
                out.push_str(&self.key);
            }
            LookupKeyType::SourceId if self.key.contains(SEPARATOR) => {
                out.push(TYPE_ESCAPED_SOURCE_ID);
                out.push_str(&self.key.replace('.', ".."));
            }
            LookupKeyType::SourceId => {
                out.push(TYPE_SOURCE_ID);
                out.push_str(&self.key);
            }
        }
    }
}

/// Stable external identifier of an aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactLookupKey {
    segments: Vec<LookupKeySegment>,
}

impl ContactLookupKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the segment for one member raw contact.
    ///
    /// Members with a source id are identified by it; others by display name.
    pub fn append(
        &mut self,
        account_type: Option<&str>,
        account_name: Option<&str>,
        source_id: Option<&str>,
        display_name: &str,
    ) {
        let segment = match source_id {
            Some(source_id) => LookupKeySegment::source_id(account_type, account_name, source_id),
            None => LookupKeySegment::display_name(account_type, account_name, display_name),
        };
        self.segments.push(segment);
    }

    pub fn push(&mut self, segment: LookupKeySegment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[LookupKeySegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Parses a lookup key string.
    pub fn parse(lookup_key: &str) -> Result<Self, LookupKeyError> {
        if lookup_key.is_empty() {
            return Err(LookupKeyError::Empty);
        }

        let chars: Vec<char> = lookup_key.chars().collect();
        let mut offset = 0;
        let mut segments = Vec::new();

        while offset < chars.len() {
            let mut hash: u32 = 0;
            while offset < chars.len() {
                let Some(digit) = chars[offset].to_digit(10) else {
                    break;
                };
                hash = hash
                    .checked_mul(10)
                    .and_then(|h| h.checked_add(digit))
                    .ok_or(LookupKeyError::HashOverflow(offset))?;
                offset += 1;
            }

            let type_position = offset;
            let type_char = chars.get(offset).copied();
            offset += 1;

            let (key_type, key) = match type_char {
                Some(TYPE_DISPLAY_NAME) => {
                    (LookupKeyType::DisplayName, read_plain(&chars, &mut offset)?)
                }
                Some(TYPE_SOURCE_ID) => (LookupKeyType::SourceId, read_plain(&chars, &mut offset)?),
                Some(TYPE_ESCAPED_SOURCE_ID) => {
                    (LookupKeyType::SourceId, read_escaped(&chars, &mut offset)?)
                }
                found => {
                    return Err(LookupKeyError::InvalidType {
                        position: type_position,
                        found,
                    })
                }
            };

            segments.push(LookupKeySegment {
                account_hash: hash,
                key_type,
                key,
            });
        }

        Ok(ContactLookupKey { segments })
    }
}

impl fmt::Display for ContactLookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push(SEPARATOR);
            }
            segment.write_to(&mut out);
        }
        f.write_str(&out)
    }
}

/// Reads up to the next separator, consuming it.
fn read_plain(chars: &[char], offset: &mut usize) -> Result<String, LookupKeyError> {
    let mut key = String::new();
    while *offset < chars.len() {
        let c = chars[*offset];
        *offset += 1;
        if c == SEPARATOR {
            if *offset == chars.len() {
                return Err(LookupKeyError::TrailingSeparator);
            }
            break;
        }
        key.push(c);
    }
    Ok(key)
}

/// Reads an escaped key: `..` is a literal dot, a single `.` ends the segment.
fn read_escaped(chars: &[char], offset: &mut usize) -> Result<String, LookupKeyError> {
    let mut key = String::new();
    while *offset < chars.len() {
        let c = chars[*offset];
        *offset += 1;
        if c != SEPARATOR {
            key.push(c);
            continue;
        }
        match chars.get(*offset) {
            Some(&SEPARATOR) => {
                key.push(SEPARATOR);
                *offset += 1;
            }
            Some(_) => break,
            None => return Err(LookupKeyError::TrailingSeparator),
        }
    }
    Ok(key)
}

/// Hash identifying the account of a member; 0 for the local account.
pub fn account_hash(account_type: Option<&str>, account_name: Option<&str>) -> u32 {
    match (account_type, account_name) {
        (Some(account_type), Some(account_name)) => {
            ((java_string_hash(account_type) ^ java_string_hash(account_name)) & ACCOUNT_HASH_MASK)
                as u32
        }
        _ => 0,
    }
}

/// `s[0]*31^(n-1) + ... + s[n-1]` over UTF-16 code units, wrapping.
///
/// Stable across processes and platforms, unlike `std::hash`.
pub fn java_string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}
