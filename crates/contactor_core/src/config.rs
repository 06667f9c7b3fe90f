//! Record store configuration.
//!
//! # Responsibility
//! - Resolve where contact records live and how long I/O may take.
//!
//! # Invariants
//! - `io_timeout` is never zero.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name under the app document root.
pub const CONTACTS_DIR_NAME: &str = "contacts";
/// Overrides the contacts directory when set and non-blank.
pub const CONTACTS_DIR_ENV: &str = "CONTACTOR_CONTACTS_DIR";
/// Overrides the per-operation I/O timeout, in milliseconds.
pub const IO_TIMEOUT_ENV: &str = "CONTACTOR_IO_TIMEOUT_MS";

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Configuration for `FileContactRepository`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding one JSON file per contact.
    pub root: PathBuf,
    /// Upper bound for every single file-system call.
    pub io_timeout: Duration,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Places the store at `<documents_root>/contacts`.
    pub fn under_documents(documents_root: impl AsRef<Path>) -> Self {
        Self::new(documents_root.as_ref().join(CONTACTS_DIR_NAME))
    }

    /// Sets the I/O timeout. Zero is replaced by the default.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = if timeout.is_zero() {
            DEFAULT_IO_TIMEOUT
        } else {
            timeout
        };
        self
    }

    /// Builds a config from environment overrides, falling back to
    /// `<fallback_documents_root>/contacts`.
    ///
    /// Unparseable timeout values are ignored.
    pub fn from_env(fallback_documents_root: impl AsRef<Path>) -> Self {
        Self::from_vars(fallback_documents_root, |key| std::env::var(key).ok())
    }

    fn from_vars(
        fallback_documents_root: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let root = lookup(CONTACTS_DIR_ENV)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| fallback_documents_root.as_ref().join(CONTACTS_DIR_NAME));

        let timeout = lookup(IO_TIMEOUT_ENV)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_IO_TIMEOUT);

        Self::new(root).with_io_timeout(timeout)
    }
}
