//! Contact domain model.
//!
//! # Responsibility
//! - Define the canonical contact record persisted by the record store.
//! - Own identifier generation and field validation.
//!
//! # Invariants
//! - `id` is assigned once and never reused for another contact.
//! - `id` only uses `[A-Za-z0-9_-]`. Ids minted here (generated or mapped
//!   from an address book) never contain `-`; hyphenated ids come only from
//!   records written by earlier app versions (UUID v4 with dashes).
//! - `name` and `phone_number` are never blank for a persisted record.
//! - A missing photo is serialized as explicit `null`, never omitted.

use crate::model::naming::sanitize;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const MAX_ID_CHARS: usize = 128;

/// Stable contact identifier.
///
/// Locally created contacts get a random UUID v4 in simple (32 hex) form.
/// Imported contacts keep their address-book id mapped into the safe alphabet.
/// Records from earlier app versions carry hyphenated UUIDs and stay valid.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(String);

impl ContactId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parses an identifier, rejecting values unsafe for file names.
    ///
    /// Accepts `-` so hyphenated UUIDs already on disk keep loading.
    pub fn parse(value: impl Into<String>) -> Result<Self, ContactValidationError> {
        let id = Self(value.into());
        id.validate()?;
        Ok(id)
    }

    /// Maps a foreign (address-book) identifier into the contact id space.
    ///
    /// Distinct foreign ids may map to the same contact id; the import
    /// merger treats that as a duplicate and skips the later candidate.
    pub fn from_external(raw: &str) -> Result<Self, ContactValidationError> {
        Self::parse(sanitize(raw.trim()).replace('-', "_"))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn validate(&self) -> Result<(), ContactValidationError> {
        if self.0.is_empty() {
            return Err(ContactValidationError::EmptyId);
        }
        if self.0.chars().count() > MAX_ID_CHARS {
            return Err(ContactValidationError::IdTooLong {
                max_chars: MAX_ID_CHARS,
            });
        }
        if !self
            .0
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        {
            return Err(ContactValidationError::InvalidId(self.0.clone()));
        }
        Ok(())
    }
}

impl Display for ContactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical persisted contact record.
///
/// Wire shape: `{ "id", "name", "phoneNumber", "photo" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub phone_number: String,
    /// Opaque URI or path of the contact photo. Older files may lack the key.
    #[serde(default)]
    pub photo: Option<String>,
}

impl Contact {
    /// Creates a contact with a freshly generated id.
    pub fn new(
        name: impl Into<String>,
        phone_number: impl Into<String>,
        photo: Option<String>,
    ) -> Self {
        Self::with_id(ContactId::generate(), name, phone_number, photo)
    }

    /// Creates a contact with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        id: ContactId,
        name: impl Into<String>,
        phone_number: impl Into<String>,
        photo: Option<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            phone_number: phone_number.into(),
            photo: normalize_photo(photo),
        }
    }

    /// Validates persisted-state invariants.
    ///
    /// # Errors
    /// - Invalid id (empty, too long, unsafe characters).
    /// - Blank `name` or `phone_number`.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        self.id.validate()?;
        if self.name.trim().is_empty() {
            return Err(ContactValidationError::EmptyName);
        }
        if self.phone_number.trim().is_empty() {
            return Err(ContactValidationError::EmptyPhoneNumber);
        }
        Ok(())
    }

    /// Applies an edit in place. The id never changes.
    pub fn apply(&mut self, patch: ContactPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(phone_number) = patch.phone_number {
            self.phone_number = phone_number;
        }
        if let Some(photo) = patch.photo {
            self.photo = normalize_photo(photo);
        }
    }
}

/// Partial edit of a contact.
///
/// `None` keeps the current value. `photo: Some(None)` clears the photo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub photo: Option<Option<String>>,
}

impl ContactPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone_number.is_none() && self.photo.is_none()
    }
}

/// Blank photo references collapse to explicit absence.
pub fn normalize_photo(photo: Option<String>) -> Option<String> {
    photo.filter(|value| !value.trim().is_empty())
}

/// Validation errors for contact invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactValidationError {
    EmptyId,
    IdTooLong { max_chars: usize },
    InvalidId(String),
    EmptyName,
    EmptyPhoneNumber,
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "contact id must not be empty"),
            Self::IdTooLong { max_chars } => {
                write!(f, "contact id must be at most {max_chars} characters")
            }
            Self::InvalidId(value) => write!(
                f,
                "contact id `{value}` contains characters outside [A-Za-z0-9_-]"
            ),
            Self::EmptyName => write!(f, "contact name must not be empty"),
            Self::EmptyPhoneNumber => write!(f, "contact phone number must not be empty"),
        }
    }
}

impl Error for ContactValidationError {}
