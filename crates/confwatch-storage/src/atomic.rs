//! Atomic write primitives.
//!
//! Content is written to a temporary sibling file, flushed to disk and then
//! renamed over the target. A crash at any point leaves either the old or
//! the new content in place, never a partial file.

use crate::StorageResult;
use std::fs::Permissions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique temp path next to `target`, so the final rename never crosses a
/// filesystem boundary and concurrent writers never share a temp file.
fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!(".{name}.{}.{n}.tmp", std::process::id()))
}

async fn write_via_temp(
    target: &Path,
    content: &[u8],
    permissions: Option<Permissions>,
) -> StorageResult<()> {
    let temp = temp_path_for(target);

    let result = async {
        let mut file = fs::File::create(&temp).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        drop(file);

        if let Some(permissions) = permissions {
            fs::set_permissions(&temp, permissions).await?;
        }

        fs::rename(&temp, target).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&temp).await;
        return Err(e.into());
    }

    debug!(path = %target.display(), bytes = content.len(), "Atomically wrote file");
    Ok(())
}

/// Atomically write bytes to a file, creating parent directories.
pub async fn write_atomic(target: &Path, content: &[u8]) -> StorageResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }
    write_via_temp(target, content, None).await
}

/// Atomically replace the content of a live file.
///
/// The existing file's permissions are carried over to the new content. The
/// parent directory must already exist; it is never created here.
pub async fn replace_file(target: &Path, content: &[u8]) -> StorageResult<()> {
    let permissions = match fs::metadata(target).await {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };
    write_via_temp(target, content, permissions).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count()
    }

    #[tokio::test]
    async fn test_write_atomic_creates_parent() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("subdir").join("test.txt");

        write_atomic(&target, b"nested").await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"nested");
        assert_eq!(tmp_files(&dir.path().join("subdir")), 0);
    }

    #[tokio::test]
    async fn test_replace_file_overwrites() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.env");
        std::fs::write(&target, "A=2\nB=3\n").unwrap();

        replace_file(&target, b"A=1\n").await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "A=1\n");
        assert_eq!(tmp_files(dir.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_replace_file_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("secret.conf");
        std::fs::write(&target, "old").unwrap();
        std::fs::set_permissions(&target, Permissions::from_mode(0o600)).unwrap();

        replace_file(&target, b"new").await.unwrap();

        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_replace_file_missing_parent_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nope").join("app.env");

        assert!(replace_file(&target, b"x").await.is_err());
        assert!(!target.exists());
    }
}
