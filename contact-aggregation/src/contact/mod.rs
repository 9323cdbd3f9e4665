// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact Aggregate Module
//!
//! A contact is the merged view of one or more raw contacts believed to
//! describe the same person. Its fields are reduced from its members.

pub mod exception;
pub mod lookup_key;

pub use exception::{AggregationException, ExceptionKind, ExceptionLink};
pub use lookup_key::{ContactLookupKey, LookupKeyError, LookupKeySegment, LookupKeyType};

use crate::name::compare_complexity;
use crate::raw_contact::{DisplayNameSource, RawContact};

/// A stored contact aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: i64,
    pub fields: AggregateFields,
}

impl Contact {
    pub fn display_name(&self) -> Option<&str> {
        self.fields.display_name.as_deref()
    }

    pub fn lookup_key(&self) -> &str {
        &self.fields.lookup_key
    }
}

/// A member raw contact together with the data the reduction needs.
#[derive(Debug, Clone)]
pub struct AggregateMember {
    pub raw_contact: RawContact,
    /// Id of the member's photo data row, if it has one.
    pub photo_data_id: Option<i64>,
    pub has_phone_number: bool,
}

/// Derived fields of an aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateFields {
    pub display_name: Option<String>,
    pub name_raw_contact_id: Option<i64>,
    pub photo_id: Option<i64>,
    pub custom_ringtone: Option<String>,
    pub send_to_voicemail: bool,
    pub last_time_contacted: Option<i64>,
    pub times_contacted: i64,
    pub starred: bool,
    pub has_phone_number: bool,
    pub single_is_restricted: bool,
    pub lookup_key: String,
}

impl AggregateFields {
    /// Reduces member data into aggregate fields.
    ///
    /// Members are processed in raw contact id order regardless of input order.
    pub fn from_members(members: &[AggregateMember]) -> Self {
        let mut members: Vec<&AggregateMember> = members.iter().collect();
        members.sort_by_key(|m| m.raw_contact.id);

        let mut fields = AggregateFields {
            send_to_voicemail: !members.is_empty(),
            ..Self::default()
        };
        let mut name_source = DisplayNameSource::Undefined;
        let mut restricted = 0;
        let mut unrestricted = 0;
        let mut lookup_key = ContactLookupKey::new();

        for member in &members {
            let raw = &member.raw_contact;

            // A stronger source wins before complexity is compared
            if let Some(name) = raw.display_name.as_deref() {
                let better = match fields.display_name.as_deref() {
                    None => true,
                    Some(best) => raw
                        .display_name_source
                        .cmp(&name_source)
                        .then_with(|| compare_complexity(name, best))
                        .is_gt(),
                };
                if better {
                    fields.display_name = Some(name.to_string());
                    fields.name_raw_contact_id = Some(raw.id);
                    name_source = raw.display_name_source;
                }
            }

            fields.has_phone_number |= member.has_phone_number;
            fields.send_to_voicemail &= raw.options.send_to_voicemail;
            fields.starred |= raw.options.starred;
            fields.times_contacted = fields.times_contacted.max(raw.options.times_contacted);
            fields.last_time_contacted = fields.last_time_contacted.max(raw.options.last_time_contacted);
            if fields.custom_ringtone.is_none() {
                fields.custom_ringtone = raw.options.custom_ringtone.clone();
            }

            if raw.is_restricted {
                restricted += 1;
            } else {
                unrestricted += 1;
            }

            lookup_key.append(
                raw.account_type(),
                raw.account_name(),
                raw.source_id.as_deref(),
                raw.display_name.as_deref().unwrap_or_default(),
            );
        }

        // Local account sorts first, then by account name; stable on id order
        fields.photo_id = members
            .iter()
            .filter(|m| m.photo_data_id.is_some())
            .min_by(|a, b| a.raw_contact.account_name().cmp(&b.raw_contact.account_name()))
            .and_then(|m| m.photo_data_id);

        fields.single_is_restricted = restricted == 1 && unrestricted == 0;
        fields.lookup_key = lookup_key.to_string();
        fields
    }
}
