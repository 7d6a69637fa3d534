//! Filesystem helpers for the working directories.
//!
//! Fetched clips land in a shared temp directory which is emptied after every
//! job; these helpers create that directory and purge it.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::MediaResult;

/// Outcome of [`clean_directory`].
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Entries removed (files, links and whole subdirectories)
    pub removed: usize,
    /// Entries that could not be removed, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Create a directory (and parents) if it does not exist.
pub async fn ensure_dir(path: impl AsRef<Path>) -> MediaResult<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).await?;
        debug!("Created directory {}", path.display());
    }
    Ok(())
}

/// Create the parent directory of a file path if needed.
pub async fn ensure_parent_dir(file_path: impl AsRef<Path>) -> MediaResult<()> {
    match file_path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent).await,
        _ => Ok(()),
    }
}

/// Delete a file if it is there. Returns whether anything was removed.
pub async fn remove_file_if_exists(path: impl AsRef<Path>) -> MediaResult<bool> {
    match fs::remove_file(path.as_ref()).await {
        Ok(()) => {
            debug!("Removed {}", path.as_ref().display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Remove every file and subdirectory inside `dir`, keeping `dir` itself.
///
/// A missing directory is treated as already clean. Failures on individual
/// entries are collected in the report rather than aborting the sweep; only
/// failing to list the directory is returned as an error.
pub async fn clean_directory(dir: impl AsRef<Path>) -> MediaResult<CleanupReport> {
    let dir = dir.as_ref();
    let mut report = CleanupReport::default();

    if !dir.exists() {
        debug!("Directory {} does not exist, nothing to clean", dir.display());
        return Ok(report);
    }

    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        // Links are removed, never followed
        let result = match fs::symlink_metadata(&path).await {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path).await,
            Ok(_) => fs::remove_file(&path).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => report.removed += 1,
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                report.failures.push((path, e.to_string()));
            }
        }
    }

    info!(
        directory = %dir.display(),
        removed = report.removed,
        failed = report.failures.len(),
        "Cleaned directory"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_remove_file_if_exists() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("output_meme.mp4");
        fs::write(&file, b"old").await.unwrap();

        assert!(remove_file_if_exists(&file).await.unwrap());
        assert!(!file.exists());
        assert!(!remove_file_if_exists(&file).await.unwrap());
    }

    #[tokio::test]
    async fn test_clean_removes_files_and_subdirectories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.mp3"), b"a").await.unwrap();
        fs::write(dir.path().join("b.webm.part"), b"b").await.unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).await.unwrap();
        fs::write(dir.path().join("nested/deeper/c.mp3"), b"c").await.unwrap();

        let report = clean_directory(dir.path()).await.unwrap();

        assert_eq!(report.removed, 3);
        assert!(report.is_clean());
        assert!(dir.path().exists(), "Directory itself should remain");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_clean_empty_directory_is_idempotent() {
        let dir = TempDir::new().unwrap();

        let first = clean_directory(dir.path()).await.unwrap();
        let second = clean_directory(dir.path()).await.unwrap();

        assert_eq!(first.removed, 0);
        assert_eq!(second.removed, 0);
        assert!(second.is_clean());
    }

    #[tokio::test]
    async fn test_clean_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");

        let report = clean_directory(&missing).await.unwrap();
        assert_eq!(report.removed, 0);
        assert!(!missing.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_does_not_follow_symlinks() {
        let outside = TempDir::new().unwrap();
        let keep = outside.path().join("keep.txt");
        fs::write(&keep, b"keep").await.unwrap();

        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let report = clean_directory(dir.path()).await.unwrap();
        assert_eq!(report.removed, 1);
        assert!(keep.exists(), "Link target must survive cleanup");
    }

    #[tokio::test]
    async fn test_ensure_parent_dir_creates_missing_parents() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("media/video/output_meme.mp4");

        ensure_parent_dir(&file).await.unwrap();
        assert!(file.parent().unwrap().is_dir());
        assert!(!file.exists());

        // Bare file names have no parent to create
        ensure_parent_dir("output.mp4").await.unwrap();
    }
}
