//! Contact use-case service.
//!
//! # Responsibility
//! - Provide create/edit/delete/view entry points for UI-facing callers.
//! - Normalize form input before it reaches the record store.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Newly created contacts always receive a generated id.

use crate::model::contact::{Contact, ContactId, ContactPatch};
use crate::repo::contact_repo::{ContactRepository, DeleteOutcome, RepoResult, RecordScan};

/// Form input for a new contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub phone_number: String,
    pub photo: Option<String>,
}

/// Use-case service wrapper over a contact repository.
pub struct ContactService<R: ContactRepository> {
    repo: R,
}

impl<R: ContactRepository> ContactService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a contact from form input.
    ///
    /// # Contract
    /// - Trims `name` and `phone_number`.
    /// - Generates a fresh id.
    /// - Returns the persisted record.
    pub async fn create_contact(&self, input: NewContact) -> RepoResult<Contact> {
        let contact = Contact::new(
            input.name.trim(),
            input.phone_number.trim(),
            input.photo,
        );
        self.repo.create(&contact).await?;
        Ok(contact)
    }

    /// Edits an existing contact by id.
    ///
    /// Text fields in the patch are trimmed. Returns the updated record or
    /// repository-level `NotFound`/validation errors unchanged.
    pub async fn update_contact(&self, id: &ContactId, patch: ContactPatch) -> RepoResult<Contact> {
        let patch = ContactPatch {
            name: patch.name.map(|name| name.trim().to_string()),
            phone_number: patch.phone_number.map(|phone| phone.trim().to_string()),
            photo: patch.photo,
        };
        self.repo.update(id, patch).await
    }

    pub async fn get_contact(&self, id: &ContactId) -> RepoResult<Option<Contact>> {
        self.repo.get(id).await
    }

    /// Lists every readable contact plus malformed-file reports.
    pub async fn list_contacts(&self) -> RepoResult<RecordScan> {
        self.repo.read_all().await
    }

    /// Deletes a contact. Deleting an absent contact is not an error.
    pub async fn delete_contact(&self, id: &ContactId) -> RepoResult<DeleteOutcome> {
        self.repo.delete(id).await
    }
}
