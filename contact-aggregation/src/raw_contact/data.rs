// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Typed data rows attached to a raw contact.

use crate::name::{Name, NameSplitter};

pub const MIME_STRUCTURED_NAME: &str = "vnd.contact/name";
pub const MIME_PHONE: &str = "vnd.contact/phone";
pub const MIME_EMAIL: &str = "vnd.contact/email";
pub const MIME_NICKNAME: &str = "vnd.contact/nickname";
pub const MIME_PHOTO: &str = "vnd.contact/photo";
pub const MIME_POSTAL: &str = "vnd.contact/postal";
pub const MIME_GROUP_MEMBERSHIP: &str = "vnd.contact/group_membership";

/// A structured name row: the display form plus its components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredName {
    pub display_name: Option<String>,
    pub prefix: Option<String>,
    pub given: Option<String>,
    pub middle: Option<String>,
    pub family: Option<String>,
    pub suffix: Option<String>,
}

impl StructuredName {
    /// A name known only by its display form.
    pub fn from_display_name(display_name: &str) -> Self {
        StructuredName {
            display_name: Some(display_name.to_string()),
            ..Self::default()
        }
    }

    /// A name known only by given and family name.
    pub fn from_parts(given: Option<&str>, family: Option<&str>) -> Self {
        StructuredName {
            given: given.map(str::to_string),
            family: family.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn has_components(&self) -> bool {
        !self.to_name().is_empty()
    }

    pub fn to_name(&self) -> Name {
        Name {
            prefix: self.prefix.clone(),
            given: self.given.clone(),
            middle: self.middle.clone(),
            family: self.family.clone(),
            suffix: self.suffix.clone(),
        }
    }

    /// Fills whichever side is missing: components from the display name, or
    /// the display name from the components.
    pub fn complete(mut self, splitter: &NameSplitter) -> Self {
        let display = self
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        match display {
            Some(display) if !self.has_components() => {
                let name = splitter.split(&display);
                self.prefix = name.prefix;
                self.given = name.given;
                self.middle = name.middle;
                self.family = name.family;
                self.suffix = name.suffix;
                self.display_name = Some(display);
            }
            Some(display) => self.display_name = Some(display),
            None => {
                let joined = splitter.join(&self.to_name());
                self.display_name = (!joined.is_empty()).then_some(joined);
            }
        }
        self
    }
}

/// A typed data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataRow {
    StructuredName(StructuredName),
    Phone { number: String },
    Email { address: String },
    Nickname { name: String },
    /// Reference to stored photo bytes (encoding is handled elsewhere).
    Photo { reference: String },
    Postal { address: String },
    GroupMembership { group_id: i64 },
}

impl DataRow {
    pub fn structured_name(display_name: &str) -> Self {
        DataRow::StructuredName(StructuredName::from_display_name(display_name))
    }

    pub fn phone(number: &str) -> Self {
        DataRow::Phone {
            number: number.to_string(),
        }
    }

    pub fn email(address: &str) -> Self {
        DataRow::Email {
            address: address.to_string(),
        }
    }

    pub fn nickname(name: &str) -> Self {
        DataRow::Nickname {
            name: name.to_string(),
        }
    }

    pub fn photo(reference: &str) -> Self {
        DataRow::Photo {
            reference: reference.to_string(),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DataRow::StructuredName(_) => MIME_STRUCTURED_NAME,
            DataRow::Phone { .. } => MIME_PHONE,
            DataRow::Email { .. } => MIME_EMAIL,
            DataRow::Nickname { .. } => MIME_NICKNAME,
            DataRow::Photo { .. } => MIME_PHOTO,
            DataRow::Postal { .. } => MIME_POSTAL,
            DataRow::GroupMembership { .. } => MIME_GROUP_MEMBERSHIP,
        }
    }

    /// Whether a change to this row invalidates the raw contact's aggregation.
    pub fn affects_matching(&self) -> bool {
        matches!(
            self,
            DataRow::StructuredName(_)
                | DataRow::Phone { .. }
                | DataRow::Email { .. }
                | DataRow::Nickname { .. }
        )
    }
}

/// A data row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    pub id: i64,
    pub raw_contact_id: i64,
    pub row: DataRow,
}

/// Kind of data row a display name was taken from, weakest first.
/// The discriminant is the stored code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DisplayNameSource {
    #[default]
    Undefined = 0,
    Phone = 10,
    Email = 20,
    Nickname = 35,
    StructuredName = 40,
}

impl DisplayNameSource {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(DisplayNameSource::Undefined),
            10 => Some(DisplayNameSource::Phone),
            20 => Some(DisplayNameSource::Email),
            35 => Some(DisplayNameSource::Nickname),
            40 => Some(DisplayNameSource::StructuredName),
            _ => None,
        }
    }
}

/// Picks the display name of a raw contact from its rows.
///
/// Priority: structured name, nickname, e-mail address, phone number. Blank
/// values are skipped.
pub fn display_name_from(rows: &[DataRow]) -> Option<(DisplayNameSource, String)> {
    let sources = [
        DisplayNameSource::StructuredName,
        DisplayNameSource::Nickname,
        DisplayNameSource::Email,
        DisplayNameSource::Phone,
    ];

    sources.into_iter().find_map(|source| {
        rows.iter()
            .find_map(|row| match (source, row) {
                (DisplayNameSource::StructuredName, DataRow::StructuredName(name)) => {
                    name.display_name.clone()
                }
                (DisplayNameSource::Nickname, DataRow::Nickname { name }) => Some(name.clone()),
                (DisplayNameSource::Email, DataRow::Email { address }) => Some(address.clone()),
                (DisplayNameSource::Phone, DataRow::Phone { number }) => Some(number.clone()),
                _ => None,
            })
            .filter(|name| !name.trim().is_empty())
            .map(|name| (source, name))
    })
}
