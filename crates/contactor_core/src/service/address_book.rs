//! Address-book port and a JSON export adapter.
//!
//! # Responsibility
//! - Describe the device address-book capability consumed by imports.
//! - Provide a file-backed address book for CLI and tests.

use async_trait::async_trait;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

/// Permission state reported by the host address book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// One contact as exposed by an external address book.
///
/// `source_id` lives in the address book's own namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBookEntry {
    #[serde(alias = "id")]
    pub source_id: String,
    pub name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

#[derive(Debug)]
pub enum AddressBookError {
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Unavailable(String),
}

impl Display for AddressBookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read address book `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid address book `{}`: {source}", path.display())
            }
            Self::Unavailable(message) => write!(f, "address book unavailable: {message}"),
        }
    }
}

impl Error for AddressBookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Unavailable(_) => None,
        }
    }
}

/// Read-only access to an external address book.
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Asks the host for read access. May prompt the user.
    async fn request_permission(&self) -> PermissionStatus;
    async fn list_contacts(&self) -> Result<Vec<AddressBookEntry>, AddressBookError>;
}

/// Address book backed by a JSON array export.
///
/// Accepted element shape: `{ "id" | "sourceId", "name", "phoneNumber"?, "photo"? }`.
#[derive(Debug, Clone)]
pub struct JsonFileAddressBook {
    path: PathBuf,
}

impl JsonFileAddressBook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AddressBook for JsonFileAddressBook {
    async fn request_permission(&self) -> PermissionStatus {
        // A local export file needs no runtime grant.
        PermissionStatus::Granted
    }

    async fn list_contacts(&self) -> Result<Vec<AddressBookEntry>, AddressBookError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| AddressBookError::Io {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_str(&raw).map_err(|source| AddressBookError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}
