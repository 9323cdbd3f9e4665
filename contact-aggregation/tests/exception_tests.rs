// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Aggregation Exception Tests
//!
//! Tests for user overrides forcing raw contacts together or apart.

mod common;

use common::*;
use contact_aggregation::*;
use parking_lot::Mutex;

#[test]
fn test_keep_in_forces_merge() {
    let storage = create_test_storage();
    let agg = ContactAggregator::default();

    let (john, _) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let (other, _) = insert_aggregated(&storage, &agg, &Person::named("Bartholomew Smith"));
    assert_ne!(contact_of(&storage, john), contact_of(&storage, other));

    agg.set_aggregation_exception(&storage, ExceptionKind::KeepIn, john, other)
        .unwrap();

    let contact_id = contact_of(&storage, john).unwrap();
    assert_eq!(contact_of(&storage, other), Some(contact_id));
    assert_eq!(storage.contact_count().unwrap(), 1);
}

#[test]
fn test_keep_out_splits_aggregate() {
    let storage = create_test_storage();
    let agg = ContactAggregator::default();

    let (first, contact_id) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let (second, joined) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    assert_eq!(contact_id, joined);

    agg.set_aggregation_exception(&storage, ExceptionKind::KeepOut, first, second)
        .unwrap();

    let a = contact_of(&storage, first).unwrap();
    let b = contact_of(&storage, second).unwrap();
    assert_ne!(a, b);
    assert_eq!(storage.contact_count().unwrap(), 2);
}

#[test]
fn test_keep_out_holds_for_later_passes() {
    let storage = create_test_storage();
    let agg = ContactAggregator::default();

    let (first, _) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let (second, _) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    agg.set_aggregation_exception(&storage, ExceptionKind::KeepOut, first, second)
        .unwrap();

    // A third duplicate joins one of them; marking the second again keeps it apart
    let (third, _) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    agg.mark_for_reaggregation(&storage, second).unwrap();
    let store = Mutex::new(storage);
    agg.run_pass(&store, &CancellationToken::new()).unwrap();

    let storage = store.lock();
    let second_contact = contact_of(&storage, second).unwrap();
    assert_ne!(contact_of(&storage, first), Some(second_contact));
    assert!(contact_of(&storage, third).is_some());
}

#[test]
fn test_exception_with_itself_is_rejected() {
    let storage = create_test_storage();
    let agg = ContactAggregator::default();
    let (raw_id, _) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));

    let err = agg
        .set_aggregation_exception(&storage, ExceptionKind::KeepIn, raw_id, raw_id)
        .unwrap_err();
    assert!(matches!(err, AggregationError::InvalidException(_)));
}

#[test]
fn test_exception_with_unknown_raw_contact_is_rejected() {
    let storage = create_test_storage();
    let agg = ContactAggregator::default();
    let (raw_id, contact_id) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));

    let err = agg
        .set_aggregation_exception(&storage, ExceptionKind::KeepOut, raw_id, 999)
        .unwrap_err();
    assert!(matches!(err, AggregationError::InvalidException(_)));

    // Nothing changed
    assert_eq!(contact_of(&storage, raw_id), Some(contact_id));
    assert!(storage.list_exceptions().unwrap().is_empty());
}

#[test]
fn test_exception_is_stored_in_canonical_order() {
    let storage = create_test_storage();
    let agg = ContactAggregator::default();
    let (first, _) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let (second, _) = insert_aggregated(&storage, &agg, &Person::named("Mary Major"));

    agg.set_aggregation_exception(&storage, ExceptionKind::KeepIn, second, first)
        .unwrap();
    // Replacing the kind keeps a single row
    agg.set_aggregation_exception(&storage, ExceptionKind::KeepOut, first, second)
        .unwrap();

    let exceptions = storage.list_exceptions().unwrap();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].kind(), ExceptionKind::KeepOut);
    assert_eq!(exceptions[0].raw_contact_id_1(), first);
    assert_eq!(exceptions[0].raw_contact_id_2(), second);
}

#[test]
fn test_disabled_partner_is_not_reaggregated() {
    let storage = create_test_storage();
    let agg = ContactAggregator::default();

    let (active, _) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let disabled = insert_person(
        &storage,
        NewRawContact::local().with_mode(AggregationMode::Disabled),
        &Person::named("John Doe"),
    );

    agg.set_aggregation_exception(&storage, ExceptionKind::KeepIn, active, disabled)
        .unwrap();

    assert!(contact_of(&storage, active).is_some());
    assert_eq!(contact_of(&storage, disabled), None);
}

#[test]
fn test_deleting_raw_contact_drops_its_exceptions() {
    let storage = create_test_storage();
    let agg = ContactAggregator::default();
    let (first, _) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let (second, _) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));

    agg.set_aggregation_exception(&storage, ExceptionKind::KeepOut, first, second)
        .unwrap();
    agg.delete_raw_contact(&storage, second).unwrap();

    assert!(storage.list_exceptions().unwrap().is_empty());
    assert!(storage.exceptions_for_raw_contact(first).unwrap().is_empty());
}
