//! Address-book import use-case.
//!
//! # Responsibility
//! - Reconcile an external contact batch against stored records.
//! - Persist the surviving candidates with per-item outcomes.
//!
//! # Invariants
//! - A candidate is skipped when an existing or already-imported record
//!   shares its id or its name (id checked first).
//! - A missing or blank photo is stored as explicit `null`.
//! - One failing candidate never aborts the batch.
//! - Permission refusal aborts before any read or write.

use crate::model::contact::{normalize_photo, Contact, ContactId, ContactValidationError};
use crate::repo::contact_repo::{ContactRepository, RepoError};
use crate::service::address_book::{
    AddressBook, AddressBookEntry, AddressBookError, PermissionStatus,
};
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Why a candidate was not imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DuplicateId,
    DuplicateName,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateId => "duplicate_id",
            Self::DuplicateName => "duplicate_name",
        }
    }
}

/// Merge decision for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accept(Contact),
    Skip(SkipReason),
    Reject(ContactValidationError),
}

/// Dedup state for one import batch.
#[derive(Debug, Clone, Default)]
pub struct ImportMerger {
    ids: HashSet<ContactId>,
    names: HashSet<String>,
}

impl ImportMerger {
    /// Seeds the merger with the records already in the store.
    pub fn new(existing: &[Contact]) -> Self {
        let mut merger = Self::default();
        for contact in existing {
            merger.record(contact);
        }
        merger
    }

    /// Decides whether `entry` should be imported.
    pub fn admit(&self, entry: &AddressBookEntry) -> Admission {
        let id = match ContactId::from_external(&entry.source_id) {
            Ok(id) => id,
            Err(err) => return Admission::Reject(err),
        };
        let name = entry.name.trim();

        if self.ids.contains(&id) {
            return Admission::Skip(SkipReason::DuplicateId);
        }
        if self.names.contains(name) {
            return Admission::Skip(SkipReason::DuplicateName);
        }

        let contact = Contact::with_id(
            id,
            name,
            entry.phone_number.as_deref().unwrap_or_default().trim(),
            normalize_photo(entry.photo.clone()),
        );
        match contact.validate() {
            Ok(()) => Admission::Accept(contact),
            Err(err) => Admission::Reject(err),
        }
    }

    /// Marks `contact` as present for later candidates.
    pub fn record(&mut self, contact: &Contact) {
        self.ids.insert(contact.id.clone());
        self.names.insert(contact.name.trim().to_string());
    }
}

/// Plans a whole batch without touching storage.
///
/// Each accepted candidate is treated as present for the ones after it.
pub fn plan_import(existing: &[Contact], entries: &[AddressBookEntry]) -> Vec<Admission> {
    let mut merger = ImportMerger::new(existing);
    entries
        .iter()
        .map(|entry| {
            let admission = merger.admit(entry);
            if let Admission::Accept(contact) = &admission {
                merger.record(contact);
            }
            admission
        })
        .collect()
}

/// Per-candidate import result.
#[derive(Debug)]
pub enum ImportOutcome {
    Imported(Contact),
    Skipped {
        source_id: String,
        reason: SkipReason,
    },
    Failed {
        source_id: String,
        error: RepoError,
    },
}

/// Batch import summary.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// One outcome per candidate, in address-book order.
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportReport {
    pub fn imported(&self) -> impl Iterator<Item = &Contact> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            ImportOutcome::Imported(contact) => Some(contact),
            _ => None,
        })
    }

    pub fn imported_count(&self) -> usize {
        self.imported().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, ImportOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, ImportOutcome::Failed { .. }))
            .count()
    }
}

/// Batch-level import failure. No record was written.
#[derive(Debug)]
pub enum ImportError {
    PermissionDenied,
    AddressBook(AddressBookError),
    Repo(RepoError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "address book permission denied"),
            Self::AddressBook(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PermissionDenied => None,
            Self::AddressBook(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<AddressBookError> for ImportError {
    fn from(value: AddressBookError) -> Self {
        Self::AddressBook(value)
    }
}

impl From<RepoError> for ImportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Import service over a contact repository.
pub struct ImportService<R: ContactRepository> {
    repo: R,
}

impl<R: ContactRepository> ImportService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Imports every new contact from `book`.
    ///
    /// # Errors
    /// - `PermissionDenied` when the address book refuses access.
    /// - `AddressBook` when the batch cannot be listed.
    /// - `Repo` when existing records cannot be read.
    ///
    /// Per-candidate failures are reported in the returned `ImportReport`.
    pub async fn import_from(&self, book: &dyn AddressBook) -> Result<ImportReport, ImportError> {
        if book.request_permission().await == PermissionStatus::Denied {
            warn!("event=contact_import module=import status=error error_code=permission_denied");
            return Err(ImportError::PermissionDenied);
        }

        let entries = book.list_contacts().await?;
        let existing = self.repo.read_all().await?;
        Ok(self.merge(&entries, &existing.contacts).await)
    }

    /// Persists the new candidates from `entries` given `existing` records.
    pub async fn merge(&self, entries: &[AddressBookEntry], existing: &[Contact]) -> ImportReport {
        let started_at = Instant::now();
        let mut merger = ImportMerger::new(existing);
        let mut report = ImportReport::default();

        for entry in entries {
            let source_id = entry.source_id.clone();
            let outcome = match merger.admit(entry) {
                Admission::Accept(contact) => match self.repo.create(&contact).await {
                    Ok(()) => {
                        merger.record(&contact);
                        ImportOutcome::Imported(contact)
                    }
                    Err(error) => {
                        warn!(
                            "event=contact_import_item module=import status=error id={} error={}",
                            contact.id, error
                        );
                        ImportOutcome::Failed { source_id, error }
                    }
                },
                Admission::Skip(reason) => ImportOutcome::Skipped { source_id, reason },
                Admission::Reject(err) => ImportOutcome::Failed {
                    source_id,
                    error: RepoError::Validation(err),
                },
            };
            report.outcomes.push(outcome);
        }

        info!(
            "event=contact_import module=import status=ok candidates={} imported={} skipped={} failed={} duration_ms={}",
            entries.len(),
            report.imported_count(),
            report.skipped_count(),
            report.failed_count(),
            started_at.elapsed().as_millis()
        );
        report
    }
}
