//! Per-path write serialization.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::trace;

/// Lazily created mutual-exclusion handles keyed by canonical path.
///
/// Handles are never removed, so the map is bounded by the number of
/// distinct files ever written. Writers to different paths never contend.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

impl PathLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`.
    pub async fn lock(&self, path: &Path) -> PathGuard {
        let handle = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(path.to_path_buf()).or_default().clone()
        };

        trace!(path = %path.display(), "Waiting for path lock");
        let guard = handle.lock_owned().await;

        PathGuard {
            path: path.to_path_buf(),
            _guard: guard,
        }
    }
}

/// Exclusive access to one path; released on drop.
#[derive(Debug)]
pub struct PathGuard {
    path: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl PathGuard {
    /// The path this guard protects.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn handles(locks: &PathLocks) -> usize {
        locks.inner.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_same_path_is_exclusive() {
        let locks = PathLocks::new();
        let guard = locks.lock(Path::new("/etc/hosts")).await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.lock(Path::new("/etc/hosts")).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_paths_do_not_block() {
        let locks = PathLocks::new();
        let _a = locks.lock(Path::new("/etc/a.conf")).await;

        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock(Path::new("/etc/b.conf")))
            .await
            .expect("unrelated path must not block");

        assert_eq!(b.path(), Path::new("/etc/b.conf"));
        assert_eq!(handles(&locks), 2);
    }

    #[tokio::test]
    async fn test_handles_are_reused() {
        let locks = PathLocks::new();
        for _ in 0..3 {
            let _g = locks.lock(Path::new("/etc/hosts")).await;
        }
        assert_eq!(handles(&locks), 1);
    }
}
