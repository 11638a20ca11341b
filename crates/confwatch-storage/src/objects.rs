//! Content-addressed object storage.
//!
//! Every blob is stored under the lowercase hex SHA-256 of its bytes,
//! sharded on the first two hex characters:
//!
//! ```text
//! root/
//!   3f/
//!     3fa9c2…   # raw bytes
//! ```
//!
//! Objects are written once and never modified, so identical contents
//! collapse to a single file.

use crate::atomic::write_atomic;
use crate::{StorageError, StorageResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Compute the hex SHA-256 digest of `content`.
pub fn digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Filesystem-backed content-addressed store.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Create a new object store at the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the object with the given digest.
    fn object_path(&self, digest: &str) -> StorageResult<PathBuf> {
        if digest.len() < 3 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(StorageError::invalid_key(format!(
                "Invalid object digest: {digest}"
            )));
        }
        let (shard, rest) = digest.split_at(2);
        Ok(self.root.join(shard).join(rest))
    }

    /// Store `content` and return its digest.
    ///
    /// Storing content that is already present is a no-op.
    pub async fn put(&self, content: &[u8]) -> StorageResult<String> {
        let digest = digest(content);
        let path = self.object_path(&digest)?;

        if fs::try_exists(&path).await? {
            debug!(digest = %digest, "Object already stored");
            return Ok(digest);
        }

        write_atomic(&path, content).await?;
        debug!(digest = %digest, bytes = content.len(), "Stored object");
        Ok(digest)
    }

    /// Load the object with the given digest, verifying its integrity.
    pub async fn get(&self, digest: &str) -> StorageResult<Vec<u8>> {
        let path = self.object_path(digest)?;

        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::not_found(&[digest]));
            }
            Err(e) => return Err(e.into()),
        };

        if self::digest(&content) != digest {
            warn!(digest = %digest, path = %path.display(), "Object failed integrity check");
            return Err(StorageError::Corrupted {
                digest: digest.to_string(),
            });
        }

        Ok(content)
    }

    /// Check whether an object is present.
    pub async fn contains(&self, digest: &str) -> StorageResult<bool> {
        let path = self.object_path(digest)?;
        Ok(fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path().join("objects"));
        (dir, store)
    }

    #[test]
    fn test_digest_is_sha256_hex() {
        assert_eq!(
            digest(b"test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[tokio::test]
    async fn test_put_get() {
        let (_dir, store) = setup();

        let d = store.put(b"A=1\n").await.unwrap();
        assert_eq!(d.len(), 64);
        assert_eq!(store.get(&d).await.unwrap(), b"A=1\n");
        assert!(store.root().join(&d[..2]).join(&d[2..]).exists());
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let (_dir, store) = setup();

        let d1 = store.put(b"same").await.unwrap();
        let d2 = store.put(b"same").await.unwrap();
        assert_eq!(d1, d2);
        assert!(store.contains(&d1).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (_dir, store) = setup();

        let result = store.get(&"0".repeat(64)).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_detects_corruption() {
        let (_dir, store) = setup();

        let d = store.put(b"original").await.unwrap();
        std::fs::write(store.root().join(&d[..2]).join(&d[2..]), b"tampered").unwrap();

        let result = store.get(&d).await;
        assert!(matches!(result, Err(StorageError::Corrupted { .. })));
    }

    #[tokio::test]
    async fn test_rejects_non_hex_digest() {
        let (_dir, store) = setup();

        let result = store.get("../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
