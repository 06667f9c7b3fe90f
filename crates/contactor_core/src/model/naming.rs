//! File-name labels derived from contact names.
//!
//! # Responsibility
//! - Map arbitrary display names onto a filesystem-safe alphabet.
//! - Build the `<label>-<id>.json` file name for one contact record.
//!
//! # Invariants
//! - `sanitize` is total and idempotent.
//! - Labels are never used as identity; the embedded record id is.

use once_cell::sync::Lazy;
use regex::Regex;

/// File extension for persisted contact records.
pub const RECORD_FILE_EXTENSION: &str = "json";

/// Upper bound on label length so file names stay within platform limits.
const MAX_LABEL_CHARS: usize = 64;

static UNSAFE_FILE_CHAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid file char regex"));

/// Replaces every character outside `[A-Za-z0-9-_]` with `_`.
pub fn sanitize(name: &str) -> String {
    UNSAFE_FILE_CHAR_RE.replace_all(name, "_").into_owned()
}

/// Builds the record file name for one contact: `<label>-<id>.json`.
///
/// The label is `sanitize(name)` cut to 64 characters. Earlier app versions
/// used the full sanitized name; the cap is a deliberate change that keeps
/// file names under common 255-byte limits. Readers never parse the label,
/// so files written either way load the same.
pub fn record_file_name(name: &str, id: &str) -> String {
    let label = sanitize(name)
        .chars()
        .take(MAX_LABEL_CHARS)
        .collect::<String>();
    format!("{label}-{id}.{RECORD_FILE_EXTENSION}")
}

/// Returns whether `file_name` looks like a committed record file.
///
/// Hidden entries (temp files from in-flight writes) are excluded.
pub fn is_record_file_name(file_name: &str) -> bool {
    !file_name.starts_with('.')
        && file_name
            .strip_suffix(RECORD_FILE_EXTENSION)
            .is_some_and(|stem| stem.ends_with('.') && stem.len() > 1)
}

#[cfg(test)]
mod tests {
    use super::{is_record_file_name, record_file_name, sanitize};

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize("Jón Smith/Jr."), "J_n_Smith_Jr_");
        assert_eq!(sanitize("safe-name_01"), "safe-name_01");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn sanitize_maps_each_code_point_once() {
        assert_eq!(sanitize("😀"), "_");
        assert_eq!(sanitize("a b\tc\n"), "a_b_c_");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in ["Bob", "Ann-Marie O'Neil", "../../etc/passwd", "名前", "  "] {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input `{input}`");
        }
    }

    #[test]
    fn record_file_name_joins_label_and_id() {
        assert_eq!(record_file_name("Bob Stone", "abc123"), "Bob_Stone-abc123.json");
    }

    #[test]
    fn record_file_name_truncates_long_labels() {
        let name = "x".repeat(300);
        let file_name = record_file_name(&name, "id");
        assert_eq!(file_name, format!("{}-id.json", "x".repeat(64)));
    }

    #[test]
    fn record_file_name_detection_skips_temp_and_foreign_files() {
        assert!(is_record_file_name("Bob-abc.json"));
        assert!(!is_record_file_name(".Bob-abc.json.tmp"));
        assert!(!is_record_file_name("notes.txt"));
        assert!(!is_record_file_name(".json"));
        assert!(!is_record_file_name("json"));
    }
}
