//! Rollback of a watched file to an earlier snapshot.
//!
//! A rollback never edits history. It restores the target content to the
//! live file and then appends a new entry that records the action:
//!
//! ```text
//! Validating -> Restoring -> Recording -> Committed
//!      \            \            \
//!       `------------`------------`----> Failed
//! ```
//!
//! Restoring and Recording run under the path's write lock, so no snapshot
//! can slip in between the restored write and its history entry.

use crate::error::{CoreError, CoreResult};
use crate::registry::FileRegistry;
use confwatch_snapshot::{ContentHash, RecordOptions, Snapshot, SnapshotStore};
use confwatch_storage::{JsonStorage, Storage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Characters of the target hash quoted in rollback comments and messages.
pub const ROLLBACK_PREFIX_LEN: usize = 8;

/// Progress of a rollback request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackState {
    Validating,
    Restoring,
    Recording,
    Committed,
    Failed,
}

impl RollbackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollbackState::Validating => "validating",
            RollbackState::Restoring => "restoring",
            RollbackState::Recording => "recording",
            RollbackState::Committed => "committed",
            RollbackState::Failed => "failed",
        }
    }
}

/// Result of a committed rollback.
#[derive(Debug, Clone)]
pub struct RollbackOutcome {
    /// Display name of the file.
    pub name: String,
    pub path: PathBuf,
    /// Hash of the restored snapshot.
    pub restored: ContentHash,
    /// The history entry appended for the rollback.
    pub snapshot: Snapshot,
}

impl RollbackOutcome {
    /// Human-readable confirmation.
    pub fn message(&self) -> String {
        format!(
            "Successfully rolled back {} to snapshot {}",
            self.name,
            self.restored.prefix(ROLLBACK_PREFIX_LEN)
        )
    }
}

/// Coordinates restore-then-record rollbacks.
pub struct RollbackCoordinator<S = JsonStorage> {
    registry: Arc<FileRegistry<S>>,
    store: Arc<SnapshotStore<S>>,
}

impl<S: Storage> RollbackCoordinator<S> {
    /// Create a coordinator writing through `registry` and recording in `store`.
    pub fn new(registry: Arc<FileRegistry<S>>, store: Arc<SnapshotStore<S>>) -> Self {
        Self { registry, store }
    }

    /// Roll `file` back to the snapshot identified by `hash` (or a prefix).
    pub async fn rollback(&self, file: &str, hash: &str) -> CoreResult<RollbackOutcome> {
        let mut state = RollbackState::Validating;
        let result = self.run(file, hash, &mut state).await;

        match &result {
            Ok(outcome) => info!(
                path = %outcome.path.display(),
                hash = %outcome.restored,
                seq = outcome.snapshot.seq,
                state = RollbackState::Committed.as_str(),
                "Rollback committed"
            ),
            Err(e) => warn!(
                file = %file,
                hash = %hash,
                failed_in = state.as_str(),
                state = RollbackState::Failed.as_str(),
                error = %e,
                "Rollback failed"
            ),
        }

        result
    }

    async fn run(
        &self,
        file: &str,
        hash: &str,
        state: &mut RollbackState,
    ) -> CoreResult<RollbackOutcome> {
        let target = self.registry.resolve(file)?;
        let restored = self.store.resolve_hash(&target.path, hash).await?;
        let content = self
            .store
            .content_at(&target.path, restored.as_str())
            .await?;

        let guard = self.store.lock(&target.path).await;

        *state = RollbackState::Restoring;
        debug!(path = %target.path.display(), hash = %restored, "Restoring content");
        self.registry.write(target, &content).await?;

        *state = RollbackState::Recording;
        let comment = format!("rollback to {}", restored.prefix(ROLLBACK_PREFIX_LEN));
        let snapshot = self
            .store
            .record_locked(&guard, &content, RecordOptions::rollback(comment))
            .await
            .map_err(CoreError::from)?
            .into_snapshot();

        *state = RollbackState::Committed;
        Ok(RollbackOutcome {
            name: target.name.clone(),
            path: target.path.clone(),
            restored,
            snapshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confwatch_snapshot::SnapshotAction;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        file: PathBuf,
        store: Arc<SnapshotStore>,
        coordinator: RollbackCoordinator,
    }

    async fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let file = dir.path().join("app.env");
        std::fs::write(&file, "A=1").unwrap();
        let file = file.canonicalize().unwrap();

        let store = Arc::new(SnapshotStore::open(dir.path().join("store")).await.unwrap());
        let registry = Arc::new(FileRegistry::new(
            &[file.display().to_string()],
            store.clone(),
        ));
        let coordinator = RollbackCoordinator::new(registry, store.clone());

        Fixture {
            _dir: dir,
            file,
            store,
            coordinator,
        }
    }

    #[tokio::test]
    async fn test_rollback_restores_and_appends() {
        let fx = fixture().await;
        let s1 = fx.store.record_snapshot(&fx.file, b"A=1", None).await.unwrap();
        std::fs::write(&fx.file, "A=2").unwrap();
        fx.store.record_snapshot(&fx.file, b"A=2", None).await.unwrap();

        let name = fx.file.display().to_string();
        let outcome = fx
            .coordinator
            .rollback(&name, &s1.hash.as_str()[..8])
            .await
            .unwrap();

        assert_eq!(std::fs::read(&fx.file).unwrap(), b"A=1");
        assert_eq!(outcome.restored, s1.hash);
        assert_eq!(
            outcome.message(),
            format!("Successfully rolled back {} to snapshot {}", name, s1.hash.prefix(8))
        );

        let history = fx.store.history(&fx.file).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].hash, s1.hash);
        assert_eq!(history[2].action, SnapshotAction::Rollback);
        assert_eq!(
            history[2].comment.as_deref(),
            Some(format!("rollback to {}", s1.hash.prefix(8)).as_str())
        );
    }

    #[tokio::test]
    async fn test_rollback_to_latest_still_appends() {
        let fx = fixture().await;
        let s1 = fx.store.record_snapshot(&fx.file, b"A=1", None).await.unwrap();

        fx.coordinator
            .rollback(&fx.file.display().to_string(), s1.hash.as_str())
            .await
            .unwrap();

        assert_eq!(fx.store.history_len(&fx.file).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rollback_unknown_file() {
        let fx = fixture().await;
        let err = fx
            .coordinator
            .rollback("/etc/passwd", "abcdef12")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownFile { .. }));
    }

    #[tokio::test]
    async fn test_rollback_unknown_hash_leaves_file_alone() {
        let fx = fixture().await;
        fx.store.record_snapshot(&fx.file, b"A=1", None).await.unwrap();
        std::fs::write(&fx.file, "A=2").unwrap();

        let hash = ContentHash::of(b"never recorded");
        let err = fx
            .coordinator
            .rollback(&fx.file.display().to_string(), hash.as_str())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(std::fs::read(&fx.file).unwrap(), b"A=2");
        assert_eq!(fx.store.history_len(&fx.file).await.unwrap(), 1);
    }
}
