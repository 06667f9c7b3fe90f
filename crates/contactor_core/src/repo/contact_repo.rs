//! Contact record store: one JSON file per contact.
//!
//! # Responsibility
//! - Provide create/read/update/delete over the contacts directory.
//! - Keep an `id -> file name` index so edits never reconstruct paths from
//!   mutable fields.
//!
//! # Invariants
//! - Write paths call `Contact::validate()` before touching disk.
//! - Records become visible only through temp-file + rename.
//! - After any successful call, no two record files carry the same id.
//! - One unreadable file never aborts `read_all`; it is reported instead.
//! - Every file-system call is bounded by `StoreConfig::io_timeout`.

use crate::config::StoreConfig;
use crate::fs::{FileSystem, TokioFileSystem};
use crate::model::contact::{Contact, ContactId, ContactPatch, ContactValidationError};
use crate::model::naming::{is_record_file_name, record_file_name};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const TEMP_FILE_SUFFIX: &str = ".tmp";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for contact persistence operations.
#[derive(Debug)]
pub enum RepoError {
    /// Store directory cannot be created or accessed.
    StorageUnavailable { path: PathBuf, source: io::Error },
    DuplicateId(ContactId),
    NotFound(ContactId),
    /// The record file name is already held by another id.
    FileNameTaken {
        file_name: String,
        holder: ContactId,
    },
    Malformed(MalformedRecord),
    Validation(ContactValidationError),
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    Timeout { op: &'static str, after: Duration },
    Serialize(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable { path, source } => write!(
                f,
                "contact storage unavailable at `{}`: {source}",
                path.display()
            ),
            Self::DuplicateId(id) => write!(f, "contact id already exists: {id}"),
            Self::NotFound(id) => write!(f, "contact not found: {id}"),
            Self::FileNameTaken { file_name, holder } => {
                write!(f, "record file `{file_name}` already belongs to contact {holder}")
            }
            Self::Malformed(record) => write!(f, "{record}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Io { op, path, source } => {
                write!(f, "{op} failed for `{}`: {source}", path.display())
            }
            Self::Timeout { op, after } => {
                write!(f, "{op} timed out after {} ms", after.as_millis())
            }
            Self::Serialize(err) => write!(f, "failed to serialize contact: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::Malformed(record) => Some(record),
            Self::Validation(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::DuplicateId(_)
            | Self::NotFound(_)
            | Self::FileNameTaken { .. }
            | Self::Timeout { .. } => None,
        }
    }
}

impl From<ContactValidationError> for RepoError {
    fn from(value: ContactValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

impl From<MalformedRecord> for RepoError {
    fn from(value: MalformedRecord) -> Self {
        Self::Malformed(value)
    }
}

/// A record file that could not be turned into a valid contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    pub file_name: String,
    pub reason: String,
}

impl MalformedRecord {
    fn new(file_name: &str, reason: impl Into<String>) -> Self {
        Self {
            file_name: file_name.to_string(),
            reason: reason.into(),
        }
    }
}

impl Display for MalformedRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed contact file `{}`: {}", self.file_name, self.reason)
    }
}

impl Error for MalformedRecord {}

/// Result of a full directory read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordScan {
    /// Valid records, deduplicated by id, in file-name order.
    pub contacts: Vec<Contact>,
    /// Files skipped because they could not be read or parsed.
    pub malformed: Vec<MalformedRecord>,
}

/// Outcome of an idempotent delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed,
    AlreadyAbsent,
}

/// Repository interface for contact persistence.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Creates the backing directory when absent. Idempotent.
    async fn ensure_ready(&self) -> RepoResult<()>;
    /// Persists a new record. Fails with `DuplicateId` when the id exists.
    async fn create(&self, contact: &Contact) -> RepoResult<()>;
    /// Reads every record, reporting malformed files separately.
    async fn read_all(&self) -> RepoResult<RecordScan>;
    async fn get(&self, id: &ContactId) -> RepoResult<Option<Contact>>;
    /// Applies `patch` to the stored record and returns the new state.
    async fn update(&self, id: &ContactId, patch: ContactPatch) -> RepoResult<Contact>;
    /// Removes the record. Absent records are not an error.
    async fn delete(&self, id: &ContactId) -> RepoResult<DeleteOutcome>;
}

#[async_trait]
impl<T: ContactRepository + ?Sized> ContactRepository for Arc<T> {
    async fn ensure_ready(&self) -> RepoResult<()> {
        (**self).ensure_ready().await
    }

    async fn create(&self, contact: &Contact) -> RepoResult<()> {
        (**self).create(contact).await
    }

    async fn read_all(&self) -> RepoResult<RecordScan> {
        (**self).read_all().await
    }

    async fn get(&self, id: &ContactId) -> RepoResult<Option<Contact>> {
        (**self).get(id).await
    }

    async fn update(&self, id: &ContactId, patch: ContactPatch) -> RepoResult<Contact> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &ContactId) -> RepoResult<DeleteOutcome> {
        (**self).delete(id).await
    }
}

type FileIndex = HashMap<ContactId, String>;

/// File-backed contact repository.
///
/// The index mutex also serializes every directory mutation.
pub struct FileContactRepository<F: FileSystem = TokioFileSystem> {
    config: StoreConfig,
    fs: F,
    index: Mutex<FileIndex>,
}

impl FileContactRepository<TokioFileSystem> {
    /// Opens the store on local disk.
    pub async fn open(config: StoreConfig) -> RepoResult<Self> {
        Self::open_with(config, TokioFileSystem).await
    }
}

impl<F: FileSystem> FileContactRepository<F> {
    /// Opens the store on a custom file system.
    ///
    /// # Side effects
    /// - Creates the contacts directory when absent.
    /// - Removes temp files left by interrupted writes.
    /// - Builds the id index from a full directory scan.
    pub async fn open_with(config: StoreConfig, fs: F) -> RepoResult<Self> {
        let started_at = Instant::now();
        let repo = Self {
            config,
            fs,
            index: Mutex::new(HashMap::new()),
        };

        let opened = async {
            let mut index = repo.index.lock().await;
            repo.prepare_dir().await?;
            repo.scan(&mut index).await
        }
        .await;

        match opened {
            Ok(scan) => {
                info!(
                    "event=store_open module=repo status=ok records={} malformed={} duration_ms={}",
                    scan.contacts.len(),
                    scan.malformed.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(repo)
            }
            Err(err) => {
                error!(
                    "event=store_open module=repo status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    pub fn root(&self) -> &Path {
        self.config.root.as_path()
    }

    fn path_of(&self, file_name: &str) -> PathBuf {
        self.config.root.join(file_name)
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = io::Result<T>>,
    ) -> RepoResult<io::Result<T>> {
        match tokio::time::timeout(self.config.io_timeout, fut).await {
            Ok(result) => Ok(result),
            Err(_) => {
                warn!(
                    "event=io_timeout module=repo status=error op={} timeout_ms={}",
                    op,
                    self.config.io_timeout.as_millis()
                );
                Err(RepoError::Timeout {
                    op,
                    after: self.config.io_timeout,
                })
            }
        }
    }

    async fn run<T>(
        &self,
        op: &'static str,
        path: &Path,
        fut: impl Future<Output = io::Result<T>>,
    ) -> RepoResult<T> {
        self.bounded(op, fut).await?.map_err(|source| RepoError::Io {
            op,
            path: path.to_path_buf(),
            source,
        })
    }

    async fn prepare_dir(&self) -> RepoResult<()> {
        let root = self.config.root.as_path();
        let unavailable = |source: io::Error| RepoError::StorageUnavailable {
            path: root.to_path_buf(),
            source,
        };

        let exists = self
            .bounded("exists", self.fs.exists(root))
            .await?
            .map_err(unavailable)?;
        if !exists {
            self.bounded("make_directory", self.fs.make_directory(root))
                .await?
                .map_err(unavailable)?;
            info!("event=store_dir_created module=repo status=ok");
        }

        self.sweep_temp_files().await
    }

    async fn sweep_temp_files(&self) -> RepoResult<()> {
        let root = self.config.root.as_path();
        let names = self
            .bounded("read_directory", self.fs.read_directory(root))
            .await?
            .map_err(|source| RepoError::StorageUnavailable {
                path: root.to_path_buf(),
                source,
            })?;

        for name in names
            .iter()
            .filter(|name| name.starts_with('.') && name.ends_with(TEMP_FILE_SUFFIX))
        {
            match self
                .bounded("delete_file", self.fs.delete_file(&self.path_of(name)))
                .await?
            {
                Ok(()) => info!("event=temp_file_swept module=repo status=ok"),
                Err(err) => warn!(
                    "event=temp_file_swept module=repo status=error error={}",
                    err
                ),
            }
        }
        Ok(())
    }

    async fn scan(&self, index: &mut FileIndex) -> RepoResult<RecordScan> {
        let root = self.config.root.as_path();
        let mut names = self
            .run("read_directory", root, self.fs.read_directory(root))
            .await?;
        names.retain(|name| is_record_file_name(name));
        names.sort();

        let mut fresh = FileIndex::with_capacity(names.len());
        let mut scan = RecordScan::default();
        for name in names {
            let contact = match self.load_record(&name).await {
                Ok(contact) => contact,
                Err(RepoError::Malformed(record)) => {
                    warn!(
                        "event=record_malformed module=repo status=skipped file={} reason={}",
                        record.file_name, record.reason
                    );
                    scan.malformed.push(record);
                    continue;
                }
                Err(RepoError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                    debug!("event=record_vanished module=repo status=skipped file={name}");
                    continue;
                }
                Err(RepoError::Io { source, .. }) => {
                    let record = MalformedRecord::new(&name, format!("unreadable: {source}"));
                    warn!(
                        "event=record_unreadable module=repo status=skipped file={} error={}",
                        name, source
                    );
                    scan.malformed.push(record);
                    continue;
                }
                Err(err) => return Err(err),
            };

            match fresh.entry(contact.id.clone()) {
                Entry::Occupied(kept) => {
                    warn!(
                        "event=record_duplicate_id module=repo status=skipped id={} kept={} skipped={}",
                        contact.id,
                        kept.get(),
                        name
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(name);
                    scan.contacts.push(contact);
                }
            }
        }

        *index = fresh;
        Ok(scan)
    }

    /// Reads and validates one record file.
    async fn load_record(&self, file_name: &str) -> RepoResult<Contact> {
        let path = self.path_of(file_name);
        let raw = match self.bounded("read_file", self.fs.read_file(&path)).await? {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::InvalidData => {
                return Err(MalformedRecord::new(file_name, "content is not UTF-8").into());
            }
            Err(source) => {
                return Err(RepoError::Io {
                    op: "read_file",
                    path,
                    source,
                })
            }
        };
        Ok(parse_record(file_name, &raw)?)
    }

    /// Loads the indexed record for `id`, or `None` when the index is stale.
    async fn load_indexed(
        &self,
        index: &FileIndex,
        id: &ContactId,
    ) -> RepoResult<Option<(String, Contact)>> {
        let Some(file_name) = index.get(id) else {
            return Ok(None);
        };
        match self.load_record(file_name).await {
            Ok(contact) if &contact.id == id => Ok(Some((file_name.clone(), contact))),
            Ok(_) => Ok(None),
            Err(RepoError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Finds the record for `id`, rescanning the directory once on a miss.
    async fn locate(
        &self,
        index: &mut FileIndex,
        id: &ContactId,
    ) -> RepoResult<Option<(String, Contact)>> {
        if let Some(found) = self.load_indexed(index, id).await? {
            return Ok(Some(found));
        }
        self.scan(index).await?;
        self.load_indexed(index, id).await
    }

    /// Writes `contact` through a hidden temp file and returns the record file name.
    ///
    /// Refuses to overwrite a file indexed under another id. Hyphenated ids
    /// make `<label>-<id>` ambiguous, e.g. `a` + `b-c` and `a-b` + `c`.
    async fn write_record(&self, index: &FileIndex, contact: &Contact) -> RepoResult<String> {
        let file_name = record_file_name(&contact.name, contact.id.as_str());
        if let Some((holder, _)) = index
            .iter()
            .find(|(id, name)| **name == file_name && **id != contact.id)
        {
            return Err(RepoError::FileNameTaken {
                file_name,
                holder: holder.clone(),
            });
        }
        let payload = serde_json::to_string(contact)?;
        let tmp_path = self.path_of(&format!(".{file_name}{TEMP_FILE_SUFFIX}"));
        let final_path = self.path_of(&file_name);

        let written = async {
            self.run("write_file", &tmp_path, self.fs.write_file(&tmp_path, &payload))
                .await?;
            self.run("rename", &final_path, self.fs.rename(&tmp_path, &final_path))
                .await
        }
        .await;

        if let Err(err) = written {
            self.discard(&tmp_path).await;
            return Err(err);
        }
        Ok(file_name)
    }

    /// Best-effort removal used on failure paths.
    async fn discard(&self, path: &Path) {
        match self.bounded("delete_file", self.fs.delete_file(path)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) if err.kind() == io::ErrorKind::NotFound => {}
            Ok(Err(err)) => warn!("event=discard_file module=repo status=error error={err}"),
            Err(err) => warn!("event=discard_file module=repo status=error error={err}"),
        }
    }
}

#[async_trait]
impl<F: FileSystem> ContactRepository for FileContactRepository<F> {
    async fn ensure_ready(&self) -> RepoResult<()> {
        let _guard = self.index.lock().await;
        self.prepare_dir().await
    }

    async fn create(&self, contact: &Contact) -> RepoResult<()> {
        contact.validate()?;
        let started_at = Instant::now();
        let mut index = self.index.lock().await;

        if index.contains_key(&contact.id) {
            warn!(
                "event=contact_create module=repo status=error error_code=duplicate_id id={}",
                contact.id
            );
            return Err(RepoError::DuplicateId(contact.id.clone()));
        }

        let file_name = self.write_record(&index, contact).await?;
        index.insert(contact.id.clone(), file_name);
        info!(
            "event=contact_create module=repo status=ok id={} duration_ms={}",
            contact.id,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    async fn read_all(&self) -> RepoResult<RecordScan> {
        let started_at = Instant::now();
        let mut index = self.index.lock().await;
        let scan = self.scan(&mut index).await?;
        info!(
            "event=contact_read_all module=repo status=ok records={} malformed={} duration_ms={}",
            scan.contacts.len(),
            scan.malformed.len(),
            started_at.elapsed().as_millis()
        );
        Ok(scan)
    }

    async fn get(&self, id: &ContactId) -> RepoResult<Option<Contact>> {
        let mut index = self.index.lock().await;
        Ok(self.locate(&mut index, id).await?.map(|(_, contact)| contact))
    }

    async fn update(&self, id: &ContactId, patch: ContactPatch) -> RepoResult<Contact> {
        let started_at = Instant::now();
        let mut index = self.index.lock().await;

        let Some((old_name, mut contact)) = self.locate(&mut index, id).await? else {
            warn!("event=contact_update module=repo status=error error_code=not_found id={id}");
            return Err(RepoError::NotFound(id.clone()));
        };

        contact.apply(patch);
        contact.validate()?;

        let new_name = self.write_record(&index, &contact).await?;
        let renamed = new_name != old_name;
        if renamed {
            let old_path = self.path_of(&old_name);
            let removed = match self
                .bounded("delete_file", self.fs.delete_file(&old_path))
                .await
            {
                Ok(Ok(())) => Ok(()),
                Ok(Err(source)) if source.kind() == io::ErrorKind::NotFound => Ok(()),
                Ok(Err(source)) => Err(RepoError::Io {
                    op: "delete_file",
                    path: old_path,
                    source,
                }),
                Err(timeout) => Err(timeout),
            };
            if let Err(err) = removed {
                // Roll back to the old file so the id stays unique on disk.
                self.discard(&self.path_of(&new_name)).await;
                error!(
                    "event=contact_update module=repo status=error error_code=old_file_kept id={} error={}",
                    id, err
                );
                return Err(err);
            }
        }

        index.insert(id.clone(), new_name);
        info!(
            "event=contact_update module=repo status=ok id={} renamed={} duration_ms={}",
            id,
            renamed,
            started_at.elapsed().as_millis()
        );
        Ok(contact)
    }

    async fn delete(&self, id: &ContactId) -> RepoResult<DeleteOutcome> {
        let mut index = self.index.lock().await;

        // A stale entry may point at a file another writer renamed; rescan once.
        let mut rescanned = false;
        let outcome = loop {
            let Some(file_name) = index.get(id).cloned() else {
                if rescanned {
                    break DeleteOutcome::AlreadyAbsent;
                }
                self.scan(&mut index).await?;
                rescanned = true;
                continue;
            };

            let path = self.path_of(&file_name);
            match self.bounded("delete_file", self.fs.delete_file(&path)).await? {
                Ok(()) => break DeleteOutcome::Removed,
                Err(source) if source.kind() == io::ErrorKind::NotFound && !rescanned => {
                    self.scan(&mut index).await?;
                    rescanned = true;
                }
                Err(source) if source.kind() == io::ErrorKind::NotFound => {
                    break DeleteOutcome::AlreadyAbsent
                }
                Err(source) => {
                    return Err(RepoError::Io {
                        op: "delete_file",
                        path,
                        source,
                    })
                }
            }
        };

        index.remove(id);
        info!(
            "event=contact_delete module=repo status={} id={}",
            match outcome {
                DeleteOutcome::Removed => "ok",
                DeleteOutcome::AlreadyAbsent => "absent",
            },
            id
        );
        Ok(outcome)
    }
}

fn parse_record(file_name: &str, raw: &str) -> Result<Contact, MalformedRecord> {
    let contact: Contact = serde_json::from_str(raw)
        .map_err(|err| MalformedRecord::new(file_name, format!("invalid json: {err}")))?;
    contact
        .validate()
        .map_err(|err| MalformedRecord::new(file_name, err.to_string()))?;
    Ok(contact)
}
