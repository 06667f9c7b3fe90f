//! Read-through contact list projection for the list view.
//!
//! # Responsibility
//! - Hold a sorted snapshot of the record store.
//! - Answer name filters synchronously without touching storage.
//!
//! # Invariants
//! - The snapshot is replaced whole; readers never observe a partial list.
//! - Mutations never refresh the cache implicitly. Callers refresh after
//!   create/update/delete/import, or the list stays stale.

use crate::model::contact::Contact;
use crate::repo::contact_repo::{ContactRepository, MalformedRecord, RepoResult};
use log::info;
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Summary of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    pub contacts: usize,
    /// Files skipped by the store during this refresh.
    pub malformed: Vec<MalformedRecord>,
}

/// Sorted, filterable snapshot of all contacts.
pub struct ContactListCache<R: ContactRepository> {
    repo: R,
    snapshot: RwLock<Arc<[Contact]>>,
}

impl<R: ContactRepository> ContactListCache<R> {
    /// Creates an empty cache. Call `refresh` before first use.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            snapshot: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Reloads every record from storage and swaps in the sorted list.
    ///
    /// On error the previous snapshot stays in place.
    pub async fn refresh(&self) -> RepoResult<RefreshSummary> {
        let scan = self.repo.read_all().await?;
        let mut contacts = scan.contacts;
        contacts.sort_by(compare_by_name);

        let summary = RefreshSummary {
            contacts: contacts.len(),
            malformed: scan.malformed,
        };
        let fresh: Arc<[Contact]> = Arc::from(contacts);
        *self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = fresh;

        info!(
            "event=contact_list_refresh module=cache status=ok contacts={} malformed={}",
            summary.contacts,
            summary.malformed.len()
        );
        Ok(summary)
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<[Contact]> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Case-insensitive substring match on names, in snapshot order.
    ///
    /// A blank query returns the whole snapshot.
    pub fn filter(&self, query: &str) -> Vec<Contact> {
        filter_by_name(&self.snapshot(), query)
    }
}

/// Accent- and case-insensitive name order, so `Émile` sorts among the `E`s.
///
/// Ties fall back to the lowercased name (plain letters before accented),
/// then the raw name, then id.
pub fn compare_by_name(left: &Contact, right: &Contact) -> Ordering {
    fold_name(&left.name)
        .cmp(&fold_name(&right.name))
        .then_with(|| left.name.to_lowercase().cmp(&right.name.to_lowercase()))
        .then_with(|| left.name.cmp(&right.name))
        .then_with(|| left.id.cmp(&right.id))
}

/// Primary collation key: NFD with combining marks dropped, lowercased.
fn fold_name(name: &str) -> String {
    name.nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn filter_by_name(contacts: &[Contact], query: &str) -> Vec<Contact> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return contacts.to_vec();
    }
    contacts
        .iter()
        .filter(|contact| contact.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{compare_by_name, filter_by_name, fold_name};
    use crate::model::contact::Contact;

    fn names(contacts: &[Contact]) -> Vec<&str> {
        contacts.iter().map(|contact| contact.name.as_str()).collect()
    }

    #[test]
    fn sorts_case_insensitively() {
        let mut contacts = vec![
            Contact::new("bob", "1", None),
            Contact::new("Alice", "2", None),
            Contact::new("Émile", "3", None),
            Contact::new("Bob", "4", None),
        ];
        contacts.sort_by(compare_by_name);
        assert_eq!(names(&contacts), vec!["Alice", "Bob", "bob", "Émile"]);
    }

    #[test]
    fn accented_names_sort_with_their_base_letter() {
        let mut contacts = vec![
            Contact::new("Zoe", "1", None),
            Contact::new("Émile", "2", None),
            Contact::new("emma", "3", None),
            Contact::new("Ängel", "4", None),
            Contact::new("Bob", "5", None),
        ];
        contacts.sort_by(compare_by_name);
        assert_eq!(
            names(&contacts),
            vec!["Ängel", "Bob", "Émile", "emma", "Zoe"]
        );
        assert_eq!(fold_name("Émile"), "emile");
    }

    #[test]
    fn filter_keeps_snapshot_order() {
        let contacts = vec![
            Contact::new("Alice", "1", None),
            Contact::new("Bob", "2", None),
            Contact::new("Robert", "3", None),
        ];
        assert_eq!(names(&filter_by_name(&contacts, "bo")), vec!["Bob", "Robert"]);
        assert_eq!(names(&filter_by_name(&contacts, "BO")), vec!["Bob", "Robert"]);
        assert_eq!(filter_by_name(&contacts, "  ").len(), 3);
        assert!(filter_by_name(&contacts, "zed").is_empty());
    }
}
