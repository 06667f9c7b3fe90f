//! `FileSystem` implementation on top of `tokio::fs`.

use super::FileSystem;
use async_trait::async_trait;
use std::io;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local disk file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn make_directory(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn read_directory(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut entries = fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            // Non UTF-8 names cannot have been written by the store.
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }

    async fn read_file(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path).await
    }

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).await
    }

    async fn delete_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::TokioFileSystem;
    use crate::fs::FileSystem;
    use tempfile::TempDir;

    #[tokio::test]
    async fn lists_only_regular_files() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("a.json"), "{}").expect("write file");
        std::fs::create_dir(dir.path().join("nested")).expect("create nested dir");

        let mut names = TokioFileSystem
            .read_directory(dir.path())
            .await
            .expect("read dir");
        names.sort();
        assert_eq!(names, vec!["a.json".to_string()]);
    }

    #[tokio::test]
    async fn exists_reports_directories_only() {
        let dir = TempDir::new().expect("temp dir");
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").expect("write file");

        assert!(TokioFileSystem.exists(dir.path()).await.expect("exists dir"));
        assert!(!TokioFileSystem.exists(&file).await.expect("exists file"));
        assert!(!TokioFileSystem
            .exists(&dir.path().join("missing"))
            .await
            .expect("exists missing"));
    }

    #[tokio::test]
    async fn write_then_rename_replaces_target() {
        let dir = TempDir::new().expect("temp dir");
        let tmp = dir.path().join(".target.tmp");
        let target = dir.path().join("target.json");
        std::fs::write(&target, "old").expect("seed target");

        TokioFileSystem.write_file(&tmp, "new").await.expect("write tmp");
        TokioFileSystem.rename(&tmp, &target).await.expect("rename");

        assert_eq!(std::fs::read_to_string(&target).expect("read"), "new");
        assert!(!tmp.exists());
    }
}
