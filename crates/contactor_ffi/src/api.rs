//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level contact functions to Dart via FRB.
//! - Own the process-wide store, list cache and async runtime.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Failures are reported through envelopes, never thrown.
//! - The list cache is refreshed only by `contacts_refresh`.

use contactor_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Contact, ContactId, ContactListCache, ContactPatch, ContactService, DeleteOutcome,
    FileContactRepository, ImportError, ImportService, JsonFileAddressBook, NewContact,
    StoreConfig,
};
use once_cell::sync::OnceCell;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

type SharedRepo = Arc<FileContactRepository>;

static RUNTIME: OnceCell<Runtime> = OnceCell::new();
static CONTACTS: OnceCell<ContactsState> = OnceCell::new();

struct ContactsState {
    service: ContactService<SharedRepo>,
    importer: ImportService<SharedRepo>,
    cache: ContactListCache<SharedRepo>,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Contact row for list/detail screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactItem {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    pub photo: Option<String>,
}

/// List envelope for the home screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactListResponse {
    pub ok: bool,
    /// Contacts sorted by name, case-insensitively.
    pub items: Vec<ContactItem>,
    /// Number of record files skipped as unreadable on the last refresh.
    pub malformed_count: u32,
    pub message: String,
}

/// Single-contact action envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactActionResponse {
    pub ok: bool,
    pub contact: Option<ContactItem>,
    pub message: String,
}

impl ContactActionResponse {
    fn success(message: impl Into<String>, contact: Option<Contact>) -> Self {
        Self {
            ok: true,
            contact: contact.map(to_contact_item),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            contact: None,
            message: message.into(),
        }
    }
}

/// Import envelope with per-batch counts for user feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResponse {
    pub ok: bool,
    pub imported: u32,
    pub skipped: u32,
    pub failed: u32,
    pub message: String,
}

/// Reloads contacts from storage into the list cache.
///
/// # FFI contract
/// - Sync call, storage-backed.
/// - Call after every create/update/delete/import, or the list stays stale.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_refresh() -> ContactListResponse {
    let refreshed = with_contacts(|state| async move {
        let summary = state.cache.refresh().await.map_err(|err| err.to_string())?;
        Ok((state.cache.snapshot().to_vec(), summary.malformed.len()))
    });

    match refreshed {
        Ok((contacts, malformed)) => {
            let message = if malformed == 0 {
                format!("Loaded {} contact(s).", contacts.len())
            } else {
                format!(
                    "Loaded {} contact(s); skipped {malformed} unreadable file(s).",
                    contacts.len()
                )
            };
            list_response(contacts, malformed, message)
        }
        Err(err) => ContactListResponse {
            ok: false,
            items: Vec::new(),
            malformed_count: 0,
            message: format!("contacts_refresh failed: {err}"),
        },
    }
}

/// Filters the cached list by case-insensitive name substring.
///
/// # FFI contract
/// - Sync call; never touches storage.
/// - Returns an empty list before the first `contacts_refresh`.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_filter(query: String) -> ContactListResponse {
    match contacts_state() {
        Ok(state) => {
            let items = state.cache.filter(&query);
            let message = format!("Matched {} contact(s).", items.len());
            list_response(items, 0, message)
        }
        Err(err) => ContactListResponse {
            ok: false,
            items: Vec::new(),
            malformed_count: 0,
            message: format!("contacts_filter failed: {err}"),
        },
    }
}

/// Loads one contact for the details screen.
#[flutter_rust_bridge::frb(sync)]
pub fn contact_get(id: String) -> ContactActionResponse {
    let result = with_contacts(|state| async move {
        let id = parse_id(&id)?;
        state
            .service
            .get_contact(&id)
            .await
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(Some(contact)) => ContactActionResponse::success("Contact loaded.", Some(contact)),
        Ok(None) => ContactActionResponse::failure("Contact not found."),
        Err(err) => ContactActionResponse::failure(format!("contact_get failed: {err}")),
    }
}

/// Creates a contact from the new-contact form.
///
/// # FFI contract
/// - Blank name or phone number is rejected.
/// - Returns the created contact, including its generated id.
#[flutter_rust_bridge::frb(sync)]
pub fn contact_create(
    name: String,
    phone_number: String,
    photo: Option<String>,
) -> ContactActionResponse {
    let input = NewContact {
        name,
        phone_number,
        photo,
    };
    let result = with_contacts(|state| async move {
        state
            .service
            .create_contact(input)
            .await
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(contact) => ContactActionResponse::success("Contact created.", Some(contact)),
        Err(err) => ContactActionResponse::failure(format!("contact_create failed: {err}")),
    }
}

/// Saves the edit-contact form.
///
/// # FFI contract
/// - Replaces name, phone number and photo; `photo = None` clears the photo.
/// - The contact id never changes.
#[flutter_rust_bridge::frb(sync)]
pub fn contact_update(
    id: String,
    name: String,
    phone_number: String,
    photo: Option<String>,
) -> ContactActionResponse {
    let patch = ContactPatch {
        name: Some(name),
        phone_number: Some(phone_number),
        photo: Some(photo),
    };
    let result = with_contacts(|state| async move {
        let id = parse_id(&id)?;
        state
            .service
            .update_contact(&id, patch)
            .await
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(contact) => ContactActionResponse::success("Contact updated.", Some(contact)),
        Err(err) => ContactActionResponse::failure(format!("contact_update failed: {err}")),
    }
}

/// Deletes a contact. Deleting an absent contact still reports success.
#[flutter_rust_bridge::frb(sync)]
pub fn contact_delete(id: String) -> ContactActionResponse {
    let result = with_contacts(|state| async move {
        let id = parse_id(&id)?;
        state
            .service
            .delete_contact(&id)
            .await
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(DeleteOutcome::Removed) => ContactActionResponse::success("Contact deleted.", None),
        Ok(DeleteOutcome::AlreadyAbsent) => {
            ContactActionResponse::success("Contact was already deleted.", None)
        }
        Err(err) => ContactActionResponse::failure(format!("contact_delete failed: {err}")),
    }
}

/// Imports contacts from a JSON address-book export at `path`.
///
/// # FFI contract
/// - Existing ids and names are skipped.
/// - Per-contact failures are counted, not fatal.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_import_json(path: String) -> ImportResponse {
    let book = JsonFileAddressBook::new(path.trim());
    let result = with_contacts(|state| async move {
        state
            .importer
            .import_from(&book)
            .await
            .map_err(|err| match err {
                ImportError::PermissionDenied => "permission denied".to_string(),
                other => other.to_string(),
            })
    });
    match result {
        Ok(report) => {
            let imported = count_u32(report.imported_count());
            let skipped = count_u32(report.skipped_count());
            let failed = count_u32(report.failed_count());
            ImportResponse {
                ok: true,
                imported,
                skipped,
                failed,
                message: format!(
                    "Imported {imported} contact(s), skipped {skipped}, failed {failed}."
                ),
            }
        }
        Err(err) => ImportResponse {
            ok: false,
            imported: 0,
            skipped: 0,
            failed: 0,
            message: format!("contacts_import_json failed: {err}"),
        },
    }
}

fn runtime() -> Result<&'static Runtime, String> {
    RUNTIME.get_or_try_init(|| {
        Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|err| format!("runtime init failed: {err}"))
    })
}

fn contacts_state() -> Result<&'static ContactsState, String> {
    CONTACTS.get_or_try_init(|| {
        let config = StoreConfig::from_env(std::env::temp_dir());
        let repo = runtime()?
            .block_on(FileContactRepository::open(config))
            .map_err(|err| format!("contact store open failed: {err}"))?;
        let repo = Arc::new(repo);
        Ok(ContactsState {
            service: ContactService::new(repo.clone()),
            importer: ImportService::new(repo.clone()),
            cache: ContactListCache::new(repo),
        })
    })
}

fn with_contacts<T, Fut>(f: impl FnOnce(&'static ContactsState) -> Fut) -> Result<T, String>
where
    Fut: Future<Output = Result<T, String>>,
{
    let state = contacts_state()?;
    runtime()?.block_on(f(state))
}

fn parse_id(raw: &str) -> Result<ContactId, String> {
    ContactId::parse(raw.trim()).map_err(|err| err.to_string())
}

fn list_response(contacts: Vec<Contact>, malformed: usize, message: String) -> ContactListResponse {
    ContactListResponse {
        ok: true,
        items: contacts.into_iter().map(to_contact_item).collect(),
        malformed_count: count_u32(malformed),
        message,
    }
}

fn to_contact_item(contact: Contact) -> ContactItem {
    ContactItem {
        id: contact.id.to_string(),
        name: contact.name,
        phone_number: contact.phone_number,
        photo: contact.photo,
    }
}

fn count_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
