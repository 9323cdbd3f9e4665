// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Lookup Key Tests
//!
//! Tests for building, formatting and parsing contact lookup keys.

mod common;

use common::strategies::*;
use contact_aggregation::contact::lookup_key::account_hash;
use contact_aggregation::*;
use proptest::prelude::*;

// ============================================================
// Formatting
// ============================================================

#[test]
fn test_local_source_id_segment() {
    let mut key = ContactLookupKey::new();
    key.append(None, None, Some("42"), "John Doe");
    assert_eq!(key.to_string(), "0i42");
}

#[test]
fn test_display_name_segment_uses_normalized_name() {
    let mut key = ContactLookupKey::new();
    key.append(None, None, None, "John Doe");
    assert_eq!(key.to_string(), format!("0n{}", normalize("John Doe")));
}

#[test]
fn test_source_id_with_dot_is_escaped() {
    let mut key = ContactLookupKey::new();
    key.append(None, None, Some("a.b"), "Ignored");
    assert_eq!(key.to_string(), "0ea..b");
}

#[test]
fn test_segments_joined_with_dot() {
    let mut key = ContactLookupKey::new();
    key.append(None, None, Some("1"), "A");
    key.append(Some("com.example"), Some("me@example.com"), Some("2"), "A");

    let hash = account_hash(Some("com.example"), Some("me@example.com"));
    assert_eq!(key.to_string(), format!("0i1.{}i2", hash));
}

#[test]
fn test_account_hash_is_masked_and_local_is_zero() {
    assert_eq!(account_hash(None, None), 0);
    assert_eq!(account_hash(Some("com.example"), None), 0);
    let hash = account_hash(Some("com.example"), Some("me@example.com"));
    assert!(hash <= 0xFFF);
}

#[test]
fn test_account_hash_is_deterministic() {
    let a = account_hash(Some("com.example"), Some("me@example.com"));
    let b = account_hash(Some("com.example"), Some("me@example.com"));
    assert_eq!(a, b);
}

// ============================================================
// Parsing
// ============================================================

#[test]
fn test_parse_mixed_key() {
    let key = ContactLookupKey::parse("0i42.17ea..b.3nabc").unwrap();
    let segments = key.segments();
    assert_eq!(segments.len(), 3);

    assert_eq!(segments[0].account_hash, 0);
    assert_eq!(segments[0].key_type, LookupKeyType::SourceId);
    assert_eq!(segments[0].key, "42");

    assert_eq!(segments[1].account_hash, 17);
    assert_eq!(segments[1].key_type, LookupKeyType::SourceId);
    assert_eq!(segments[1].key, "a.b");

    assert_eq!(segments[2].account_hash, 3);
    assert_eq!(segments[2].key_type, LookupKeyType::DisplayName);
    assert_eq!(segments[2].key, "abc");
}

#[test]
fn test_parse_escaped_segment_ending_key() {
    let key = ContactLookupKey::parse("5ex..y").unwrap();
    assert_eq!(key.segments()[0].key, "x.y");
}

#[test]
fn test_parse_empty_key_fails() {
    assert_eq!(ContactLookupKey::parse(""), Err(LookupKeyError::Empty));
}

#[test]
fn test_parse_unknown_type_fails() {
    let err = ContactLookupKey::parse("12x99").unwrap_err();
    assert_eq!(
        err,
        LookupKeyError::InvalidType {
            position: 2,
            found: Some('x')
        }
    );
}

#[test]
fn test_parse_missing_type_fails() {
    let err = ContactLookupKey::parse("123").unwrap_err();
    assert_eq!(
        err,
        LookupKeyError::InvalidType {
            position: 3,
            found: None
        }
    );
}

#[test]
fn test_parse_trailing_separator_fails() {
    assert_eq!(
        ContactLookupKey::parse("0i42."),
        Err(LookupKeyError::TrailingSeparator)
    );
}

#[test]
fn test_parse_hash_overflow_fails() {
    let err = ContactLookupKey::parse("99999999999i1").unwrap_err();
    assert!(matches!(err, LookupKeyError::HashOverflow(_)));
}

// ============================================================
// Property Tests
// ============================================================

proptest! {
    #[test]
    fn prop_source_id_key_round_trips(
        account in account_strategy(),
        source_id in source_id_strategy(),
    ) {
        let (account_type, account_name) = match &account {
            Some((t, n)) => (Some(t.as_str()), Some(n.as_str())),
            None => (None, None),
        };
        let mut key = ContactLookupKey::new();
        key.append(account_type, account_name, Some(&source_id), "Unused");
        key.append(None, None, Some("7"), "Unused");

        let parsed = ContactLookupKey::parse(&key.to_string()).unwrap();
        prop_assert_eq!(parsed, key);
    }

    #[test]
    fn prop_display_name_key_round_trips(name in full_name_strategy()) {
        let mut key = ContactLookupKey::new();
        key.append(None, None, None, &name);

        let parsed = ContactLookupKey::parse(&key.to_string()).unwrap();
        prop_assert_eq!(parsed.segments()[0].key.clone(), normalize(&name));
    }
}
