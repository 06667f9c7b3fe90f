//! Capability-scoped file-system port.
//!
//! # Responsibility
//! - Define the minimal file operations the record store depends on.
//! - Keep the store testable against stalled or failing file systems.
//!
//! # Invariants
//! - Implementations report failures as `std::io::Error`; the store maps
//!   them to semantic errors and applies timeouts.

use async_trait::async_trait;
use std::io;
use std::path::Path;

mod tokio_fs;

pub use tokio_fs::TokioFileSystem;

/// File operations used by the record store.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Returns whether `path` exists and is a directory.
    async fn exists(&self, path: &Path) -> io::Result<bool>;
    /// Creates `path` and any missing parents. Succeeds if it already exists.
    async fn make_directory(&self, path: &Path) -> io::Result<()>;
    /// Lists regular file names directly under `path`.
    async fn read_directory(&self, path: &Path) -> io::Result<Vec<String>>;
    async fn read_file(&self, path: &Path) -> io::Result<String>;
    /// Writes `contents` and flushes them to stable storage.
    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()>;
    /// Atomically replaces `to` with `from`.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    async fn delete_file(&self, path: &Path) -> io::Result<()>;
}
