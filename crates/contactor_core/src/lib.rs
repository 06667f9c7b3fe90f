//! Core contact persistence for Contactor.
//! This crate is the single source of truth for contact invariants.

pub mod cache;
pub mod config;
pub mod fs;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use cache::contact_list::{ContactListCache, RefreshSummary};
pub use config::StoreConfig;
pub use fs::{FileSystem, TokioFileSystem};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::contact::{Contact, ContactId, ContactPatch, ContactValidationError};
pub use model::naming::{record_file_name, sanitize};
pub use repo::contact_repo::{
    ContactRepository, DeleteOutcome, FileContactRepository, MalformedRecord, RecordScan,
    RepoError, RepoResult,
};
pub use service::address_book::{
    AddressBook, AddressBookEntry, AddressBookError, JsonFileAddressBook, PermissionStatus,
};
pub use service::contact_service::{ContactService, NewContact};
pub use service::import_service::{
    plan_import, Admission, ImportError, ImportMerger, ImportOutcome, ImportReport, ImportService,
    SkipReason,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
