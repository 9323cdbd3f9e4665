// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Aggregation Tests
//!
//! End-to-end tests for aggregation decisions, batch passes and the
//! maintenance operations around them.

mod common;

use std::collections::BTreeMap;

use common::*;
use contact_aggregation::*;
use parking_lot::Mutex;

fn aggregator() -> ContactAggregator {
    ContactAggregator::default()
}

// ============================================================
// Single Decisions
// ============================================================

#[test]
fn test_exact_duplicates_merge() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, first) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let (_, second) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));

    assert_eq!(first, second);
    assert_eq!(storage.contact_count().unwrap(), 1);
    assert_eq!(storage.contact_member_count(first).unwrap(), 2);
}

#[test]
fn test_case_and_accents_do_not_prevent_merge() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, first) = insert_aggregated(&storage, &agg, &Person::named("José García"));
    let (_, second) = insert_aggregated(&storage, &agg, &Person::named("jose garcia"));

    assert_eq!(first, second);
}

#[test]
fn test_reordered_name_merges() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, first) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let (_, second) = insert_aggregated(&storage, &agg, &Person::named("Doe, John"));

    assert_eq!(first, second);
}

#[test]
fn test_nickname_variant_merges() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, first) = insert_aggregated(&storage, &agg, &Person::named("Robert Smith"));
    let (_, second) = insert_aggregated(&storage, &agg, &Person::named("Bob Smith"));

    assert_eq!(first, second);
}

#[test]
fn test_near_duplicate_with_shared_phone_merges() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, first) = insert_aggregated(
        &storage,
        &agg,
        &Person::named("John Doe").phone("555-0100"),
    );
    let (_, second) = insert_aggregated(
        &storage,
        &agg,
        &Person::named("Jon Doe").phone("(555) 0100"),
    );

    assert_eq!(first, second);
}

#[test]
fn test_near_duplicate_without_shared_data_stays_apart() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, first) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let (_, second) = insert_aggregated(&storage, &agg, &Person::named("Jon Doe"));

    assert_ne!(first, second);
}

#[test]
fn test_different_people_with_same_family_name_stay_apart() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, first) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let (_, second) = insert_aggregated(&storage, &agg, &Person::named("Deborah Doe"));

    assert_ne!(first, second);
    assert_eq!(storage.contact_count().unwrap(), 2);
}

#[test]
fn test_shared_phone_with_unrelated_name_stays_apart() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, first) = insert_aggregated(
        &storage,
        &agg,
        &Person::named("John Doe").phone("555-0100"),
    );
    let (_, second) = insert_aggregated(
        &storage,
        &agg,
        &Person::named("Bartholomew Smith").phone("555-0100"),
    );

    assert_ne!(first, second);
}

#[test]
fn test_email_resembling_other_name_does_not_merge_on_shared_phone() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, deborah) = insert_aggregated(
        &storage,
        &agg,
        &Person::named("Deborah Doe").phone("555-0100"),
    );
    // The e-mail local part equals Deborah's name key; only the names decide
    let (_, john) = insert_aggregated(
        &storage,
        &agg,
        &Person::named("John Doe")
            .phone("555-0100")
            .email("deborah.doe@example.com"),
    );

    assert_ne!(deborah, john);
    assert_eq!(storage.contact_count().unwrap(), 2);
}

#[test]
fn test_nameless_contacts_merge_on_shared_email() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, first) = insert_aggregated(
        &storage,
        &agg,
        &Person::default().email("someone@example.com"),
    );
    let (_, second) = insert_aggregated(
        &storage,
        &agg,
        &Person::default().email("Someone@Example.com "),
    );

    assert_eq!(first, second);
}

#[test]
fn test_already_aggregated_returns_current_aggregate() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (raw_id, contact_id) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    assert_eq!(agg.aggregate_contact(&storage, raw_id).unwrap(), Some(contact_id));
    assert_eq!(storage.contact_count().unwrap(), 1);
}

#[test]
fn test_disabled_raw_contact_is_never_aggregated() {
    let storage = create_test_storage();
    let agg = aggregator();

    let raw_id = insert_person(
        &storage,
        NewRawContact::local().with_mode(AggregationMode::Disabled),
        &Person::named("John Doe"),
    );

    assert_eq!(agg.aggregate_contact(&storage, raw_id).unwrap(), None);
    assert_eq!(contact_of(&storage, raw_id), None);
    assert!(storage.pending_raw_contact_ids().unwrap().is_empty());
}

#[test]
fn test_unknown_raw_contact_fails() {
    let storage = create_test_storage();
    let err = aggregator().aggregate_contact(&storage, 999).unwrap_err();
    assert!(matches!(err, AggregationError::RawContactNotFound(999)));
}

#[test]
fn test_immediate_raw_contact_is_aggregated_on_insert() {
    let storage = create_test_storage();
    let agg = aggregator();

    let immediate = insert_person(
        &storage,
        NewRawContact::local().with_mode(AggregationMode::Immediate),
        &Person::named("John Doe"),
    );
    let deferred = insert_local(&storage, &Person::named("John Doe"));

    let contact_id = agg.on_raw_contact_inserted(&storage, immediate).unwrap();
    assert!(contact_id.is_some());
    assert_eq!(agg.on_raw_contact_inserted(&storage, deferred).unwrap(), None);
    assert_eq!(contact_of(&storage, deferred), None);
    assert_eq!(storage.pending_raw_contact_ids().unwrap(), vec![deferred]);
}

// ============================================================
// Aggregate Fields
// ============================================================

#[test]
fn test_aggregate_fields_are_reduced_from_members() {
    let storage = create_test_storage();
    let agg = aggregator();

    let first = insert_person(
        &storage,
        NewRawContact::local().with_options(RawContactOptions {
            send_to_voicemail: true,
            times_contacted: 3,
            last_time_contacted: Some(100),
            ..RawContactOptions::default()
        }),
        &Person::named("john doe"),
    );
    let second = insert_person(
        &storage,
        NewRawContact::for_account("com.example", "me@example.com")
            .with_source_id("abc")
            .with_options(RawContactOptions {
                starred: true,
                custom_ringtone: Some("bell".to_string()),
                times_contacted: 1,
                last_time_contacted: Some(500),
                ..RawContactOptions::default()
            }),
        &Person::named("John Doe").phone("555-0100"),
    );

    let contact_id = agg.aggregate_contact(&storage, first).unwrap().unwrap();
    assert_eq!(agg.aggregate_contact(&storage, second).unwrap(), Some(contact_id));

    let contact = storage.load_contact(contact_id).unwrap().unwrap();
    assert_eq!(contact.display_name(), Some("John Doe"));
    assert_eq!(contact.fields.name_raw_contact_id, Some(second));
    assert!(contact.fields.starred);
    assert!(!contact.fields.send_to_voicemail);
    assert!(contact.fields.has_phone_number);
    assert_eq!(contact.fields.custom_ringtone.as_deref(), Some("bell"));
    assert_eq!(contact.fields.times_contacted, 3);
    assert_eq!(contact.fields.last_time_contacted, Some(500));
    assert!(!contact.fields.single_is_restricted);
}

#[test]
fn test_photo_prefers_local_account() {
    let storage = create_test_storage();
    let agg = aggregator();

    let synced = insert_person(
        &storage,
        NewRawContact::for_account("com.example", "me@example.com"),
        &Person::named("John Doe"),
    );
    storage.insert_data(synced, &DataRow::photo("synced.jpg")).unwrap();
    let local = insert_local(&storage, &Person::named("John Doe"));
    let local_photo = storage.insert_data(local, &DataRow::photo("local.jpg")).unwrap();

    let contact_id = agg.aggregate_contact(&storage, synced).unwrap().unwrap();
    agg.aggregate_contact(&storage, local).unwrap();

    let contact = storage.load_contact(contact_id).unwrap().unwrap();
    assert_eq!(contact.fields.photo_id, Some(local_photo));
}

#[test]
fn test_single_restricted_member() {
    let storage = create_test_storage();
    let agg = aggregator();

    let raw_id = insert_person(
        &storage,
        NewRawContact::local().restricted(),
        &Person::named("John Doe"),
    );
    let contact_id = agg.aggregate_contact(&storage, raw_id).unwrap().unwrap();
    let contact = storage.load_contact(contact_id).unwrap().unwrap();
    assert!(contact.fields.single_is_restricted);

    insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let contact = storage.load_contact(contact_id).unwrap().unwrap();
    assert!(!contact.fields.single_is_restricted);
}

#[test]
fn test_structured_name_beats_email_display_name() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (john, _) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let (zoe, _) = insert_aggregated(&storage, &agg, &Person::default().email("zoe@example.com"));
    assert_eq!(
        storage.get_raw_contact(zoe).unwrap().display_name_source,
        DisplayNameSource::Email
    );

    agg.set_aggregation_exception(&storage, ExceptionKind::KeepIn, john, zoe)
        .unwrap();

    let contact_id = contact_of(&storage, john).unwrap();
    assert_eq!(contact_of(&storage, zoe), Some(contact_id));
    let contact = storage.load_contact(contact_id).unwrap().unwrap();
    assert_eq!(contact.display_name(), Some("John Doe"));
    assert_eq!(contact.fields.name_raw_contact_id, Some(john));
}

#[test]
fn test_update_aggregate_data_of_unknown_contact_fails() {
    let storage = create_test_storage();
    let err = aggregator().update_aggregate_data(&storage, 42).unwrap_err();
    assert!(matches!(err, AggregationError::ContactNotFound(42)));
}

// ============================================================
// Batch Pass
// ============================================================

#[test]
fn test_run_pass_aggregates_pending_contacts() {
    let storage = create_test_storage();
    let ids = [
        insert_local(&storage, &Person::named("John Doe")),
        insert_local(&storage, &Person::named("Deborah Doe")),
        insert_local(&storage, &Person::named("John Doe")),
    ];
    let store = Mutex::new(storage);

    let summary = aggregator()
        .run_pass(&store, &CancellationToken::new())
        .unwrap();
    assert_eq!(
        summary,
        PassSummary {
            pending: 3,
            joined: 1,
            created: 2,
            skipped: 0,
            interrupted: false,
        }
    );

    let storage = store.lock();
    assert!(storage.pending_raw_contact_ids().unwrap().is_empty());
    assert_eq!(contact_of(&storage, ids[0]), contact_of(&storage, ids[2]));
    assert_ne!(contact_of(&storage, ids[0]), contact_of(&storage, ids[1]));
}

#[test]
fn test_cancelled_pass_leaves_contacts_pending() {
    let storage = create_test_storage();
    insert_local(&storage, &Person::named("John Doe"));
    insert_local(&storage, &Person::named("Deborah Doe"));
    let store = Mutex::new(storage);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = aggregator().run_pass(&store, &cancel).unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.pending, 2);
    assert_eq!(summary.joined + summary.created, 0);
    assert_eq!(store.lock().pending_raw_contact_ids().unwrap().len(), 2);

    let summary = aggregator()
        .run_pass(&store, &CancellationToken::new())
        .unwrap();
    assert!(!summary.interrupted);
    assert_eq!(summary.created, 2);
}

/// Groups person indexes by the aggregate their raw contact ended up in.
fn partition(people: &[Person], order: &[usize]) -> Vec<Vec<usize>> {
    let storage = create_test_storage();
    let raw_ids: Vec<(usize, i64)> = order
        .iter()
        .map(|&i| (i, insert_local(&storage, &people[i])))
        .collect();
    let store = Mutex::new(storage);
    aggregator()
        .run_pass(&store, &CancellationToken::new())
        .unwrap();

    let storage = store.lock();
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (person, raw_id) in raw_ids {
        let contact_id = contact_of(&storage, raw_id).unwrap();
        groups.entry(contact_id).or_default().push(person);
    }
    let mut groups: Vec<Vec<usize>> = groups
        .into_values()
        .map(|mut g| {
            g.sort_unstable();
            g
        })
        .collect();
    groups.sort();
    groups
}

#[test]
fn test_partition_does_not_depend_on_processing_order() {
    let people = vec![
        Person::named("John Doe").phone("555-0100"),
        Person::named("Deborah Doe"),
        Person::named("john doe").email("jdoe@example.com"),
        Person::named("Mary Major"),
        Person::named("MARY MAJOR").phone("555-0199"),
    ];

    let forward = partition(&people, &[0, 1, 2, 3, 4]);
    let backward = partition(&people, &[4, 3, 2, 1, 0]);
    let shuffled = partition(&people, &[2, 4, 0, 1, 3]);

    assert_eq!(forward, vec![vec![0, 2], vec![1], vec![3, 4]]);
    assert_eq!(forward, backward);
    assert_eq!(forward, shuffled);
}

#[test]
fn test_approximate_chain_partition_does_not_depend_on_insertion_order() {
    let people = vec![
        Person::named("John Doe"),
        Person::named("John Doe").phone("555-0100"),
        Person::named("Jon Doe").phone("555-0100"),
    ];
    let orders = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for order in orders {
        assert_eq!(partition(&people, &order), vec![vec![0, 1, 2]], "order {:?}", order);
    }
}

#[test]
fn test_canonical_order_follows_content() {
    let storage = create_test_storage();
    let jon = insert_local(&storage, &Person::named("Jon Doe").phone("555-0100"));
    let john_with_phone = insert_local(&storage, &Person::named("John Doe").phone("555-0100"));
    let john = insert_local(&storage, &Person::named("john doe"));

    let ordered = canonical_order(&storage, vec![jon, john_with_phone, john]).unwrap();
    assert_eq!(ordered, vec![john, john_with_phone, jon]);
}

#[test]
fn test_invalid_config_is_rejected_by_constructor() {
    let config = AggregationConfig::default().with_max_name_tokens(10);
    assert!(matches!(
        ContactAggregator::new(config),
        Err(AggregationError::Configuration(_))
    ));
    assert!(ContactAggregator::new(AggregationConfig::default().with_max_name_tokens(3)).is_ok());
}

// ============================================================
// Maintenance
// ============================================================

#[test]
fn test_changed_name_is_reaggregated() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, contact_id) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let (raw_id, _) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));

    let name_row = storage
        .data_for_raw_contact(raw_id)
        .unwrap()
        .into_iter()
        .find(|record| matches!(record.row, DataRow::StructuredName(_)))
        .unwrap();
    storage
        .update_data(name_row.id, &DataRow::structured_name("Mary Major"))
        .unwrap();

    let mode = agg.on_raw_contact_changed(&storage, raw_id).unwrap();
    assert_eq!(mode, AggregationMode::Default);
    assert_eq!(contact_of(&storage, raw_id), None);
    assert_eq!(storage.contact_member_count(contact_id).unwrap(), 1);

    let new_contact = agg.aggregate_contact(&storage, raw_id).unwrap().unwrap();
    assert_ne!(new_contact, contact_id);
    let contact = storage.load_contact(new_contact).unwrap().unwrap();
    assert_eq!(contact.display_name(), Some("Mary Major"));
}

#[test]
fn test_mark_sole_member_removes_aggregate() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (raw_id, contact_id) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    agg.mark_for_reaggregation(&storage, raw_id).unwrap();

    assert!(storage.load_contact(contact_id).unwrap().is_none());
    assert_eq!(storage.pending_raw_contact_ids().unwrap(), vec![raw_id]);
    assert!(storage.name_lookups_for_raw_contact(raw_id).unwrap().is_empty());
}

#[test]
fn test_mark_disabled_raw_contact_is_noop() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (raw_id, contact_id) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    storage
        .set_aggregation_mode(raw_id, AggregationMode::Disabled)
        .unwrap();

    let mode = agg.mark_for_reaggregation(&storage, raw_id).unwrap();
    assert_eq!(mode, AggregationMode::Disabled);
    assert_eq!(contact_of(&storage, raw_id), Some(contact_id));
}

#[test]
fn test_delete_raw_contact_refreshes_aggregate() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (first, contact_id) = insert_aggregated(&storage, &agg, &Person::named("john doe"));
    let (second, _) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    assert_eq!(
        storage.load_contact(contact_id).unwrap().unwrap().display_name(),
        Some("John Doe")
    );

    agg.delete_raw_contact(&storage, second).unwrap();
    let contact = storage.load_contact(contact_id).unwrap().unwrap();
    assert_eq!(contact.display_name(), Some("john doe"));
    assert_eq!(contact.fields.name_raw_contact_id, Some(first));

    agg.delete_raw_contact(&storage, first).unwrap();
    assert!(storage.load_contact(contact_id).unwrap().is_none());

    let err = agg.delete_raw_contact(&storage, first).unwrap_err();
    assert!(matches!(err, AggregationError::RawContactNotFound(_)));
}

// ============================================================
// Suggestions
// ============================================================

#[test]
fn test_query_suggestions_ranks_similar_aggregates() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, john) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    let (_, jon) = insert_aggregated(&storage, &agg, &Person::named("Jon Doe"));
    let (_, deborah) = insert_aggregated(&storage, &agg, &Person::named("Deborah Doe"));
    assert_ne!(john, jon);

    let suggestions = agg.query_suggestions(&storage, john, 10).unwrap();
    assert_eq!(suggestions, vec![jon]);
    assert!(!suggestions.contains(&deborah));
    assert!(!suggestions.contains(&john));
}

#[test]
fn test_query_suggestions_respects_limit_and_unknown_contact() {
    let storage = create_test_storage();
    let agg = aggregator();

    let (_, john) = insert_aggregated(&storage, &agg, &Person::named("John Doe"));
    insert_aggregated(&storage, &agg, &Person::named("Jon Doe"));

    assert!(agg.query_suggestions(&storage, john, 0).unwrap().is_empty());
    let err = agg.query_suggestions(&storage, 999, 10).unwrap_err();
    assert!(matches!(err, AggregationError::ContactNotFound(999)));
}

// ============================================================
// Lookup Keys
// ============================================================

#[test]
fn test_lookup_key_resolves_aggregate() {
    let storage = create_test_storage();
    let agg = aggregator();

    let first = insert_person(
        &storage,
        NewRawContact::for_account("com.example", "me@example.com").with_source_id("a.1"),
        &Person::named("John Doe"),
    );
    let contact_id = agg.aggregate_contact(&storage, first).unwrap().unwrap();
    insert_aggregated(&storage, &agg, &Person::named("John Doe"));

    let key = storage
        .load_contact(contact_id)
        .unwrap()
        .unwrap()
        .lookup_key()
        .to_string();
    let parsed = ContactLookupKey::parse(&key).unwrap();
    assert_eq!(parsed.segments().len(), 2);
    assert_eq!(parsed.segments()[0].key, "a.1");
    assert_eq!(parsed.segments()[1].key_type, LookupKeyType::DisplayName);

    assert_eq!(agg.lookup_contact(&storage, &key).unwrap(), Some(contact_id));
}

#[test]
fn test_lookup_key_survives_member_loss() {
    let storage = create_test_storage();
    let agg = aggregator();

    let first = insert_person(
        &storage,
        NewRawContact::local().with_source_id("s1"),
        &Person::named("John Doe"),
    );
    let second = insert_person(
        &storage,
        NewRawContact::local().with_source_id("s2"),
        &Person::named("John Doe"),
    );
    let contact_id = agg.aggregate_contact(&storage, first).unwrap().unwrap();
    agg.aggregate_contact(&storage, second).unwrap();
    let key = storage.load_contact(contact_id).unwrap().unwrap().fields.lookup_key;
    assert_eq!(key, "0is1.0is2");

    agg.delete_raw_contact(&storage, first).unwrap();
    assert_eq!(agg.lookup_contact(&storage, &key).unwrap(), Some(contact_id));
}

#[test]
fn test_lookup_of_unknown_or_invalid_key() {
    let storage = create_test_storage();
    let agg = aggregator();

    assert_eq!(agg.lookup_contact(&storage, "0inothere").unwrap(), None);
    let err = agg.lookup_contact(&storage, "").unwrap_err();
    assert!(matches!(err, AggregationError::LookupKey(LookupKeyError::Empty)));
}
