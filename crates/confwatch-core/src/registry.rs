//! Watched-file registry.
//!
//! Maps configured watch-paths to canonical absolute paths and is the only
//! way into the engine: anything that does not resolve here is rejected
//! before touching the filesystem.

use crate::error::{CoreError, CoreResult};
use confwatch_snapshot::{RecordOptions, RecordOutcome, SnapshotStore};
use confwatch_storage::{atomic, JsonStorage, Storage, StorageError};
use confwatch_util::path;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A configured watch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    /// The path as written in the configuration.
    pub name: String,
    /// Canonical absolute path.
    pub path: PathBuf,
    /// `name` with `~` expanded, made absolute and normalized, without
    /// following symlinks.
    pub lexical: PathBuf,
}

/// Live status of a watch target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchedFile {
    pub name: String,
    #[serde(serialize_with = "display_path")]
    pub abs_path: PathBuf,
    pub exists: bool,
    pub has_history: bool,
    pub history_count: usize,
}

/// Registry of watch targets backed by a snapshot store.
pub struct FileRegistry<S = JsonStorage> {
    targets: Vec<WatchTarget>,
    store: Arc<SnapshotStore<S>>,
}

impl<S: Storage> FileRegistry<S> {
    /// Build the registry from configured watch entries.
    ///
    /// Entries that resolve to the same canonical path are kept once, under
    /// the first name.
    pub fn new(watch: &[String], store: Arc<SnapshotStore<S>>) -> Self {
        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(watch.len());

        for name in watch {
            let path = path::resolve_user_path(name);
            if !seen.insert(path.clone()) {
                warn!(name = %name, path = %path.display(), "Duplicate watch entry ignored");
                continue;
            }
            debug!(name = %name, path = %path.display(), "Registered watch target");
            targets.push(WatchTarget {
                name: name.clone(),
                lexical: path::absolutize(&path::expand_tilde(name)),
                path,
            });
        }

        Self { targets, store }
    }

    /// Configured targets, in configuration order.
    pub fn targets(&self) -> &[WatchTarget] {
        &self.targets
    }

    /// Current status of every target, computed fresh.
    pub async fn list(&self) -> CoreResult<Vec<WatchedFile>> {
        let mut files = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            files.push(self.status(target).await?);
        }
        Ok(files)
    }

    /// Current status of one target.
    pub async fn status(&self, target: &WatchTarget) -> CoreResult<WatchedFile> {
        let exists = tokio::fs::try_exists(&target.path).await.unwrap_or(false);
        let history_count = self.store.history_len(&target.path).await?;
        Ok(WatchedFile {
            name: target.name.clone(),
            abs_path: target.path.clone(),
            exists,
            has_history: history_count > 0,
            history_count,
        })
    }

    /// Resolve a display name or a path to its watch target.
    ///
    /// Matching is purely lexical: the input is compared, after `~`
    /// expansion and normalization, with each target's configured and
    /// canonical paths. Nothing is looked up on disk, so a symlink to a
    /// watched file is not the watched file.
    ///
    /// Fails with [`CoreError::UnknownFile`] for anything not configured.
    pub fn resolve(&self, file: &str) -> CoreResult<&WatchTarget> {
        let file = file.trim();
        let lexical = path::absolutize(&path::expand_tilde(file));
        self.targets
            .iter()
            .find(|t| t.name == file || t.lexical == lexical || t.path == lexical)
            .ok_or_else(|| CoreError::unknown_file(file))
    }

    /// Find the target for an already canonical path.
    pub fn target_for(&self, abs_path: &Path) -> Option<&WatchTarget> {
        self.targets.iter().find(|t| t.path == abs_path)
    }

    /// Read the live content of a target.
    pub async fn read(&self, target: &WatchTarget) -> CoreResult<Vec<u8>> {
        tokio::fs::read(&target.path)
            .await
            .map_err(|e| CoreError::io(&target.path, e))
    }

    /// Snapshot the live content of a target.
    ///
    /// The file is read under the path's write lock, so a capture cannot
    /// record content that a concurrent rollback has already replaced.
    pub async fn capture(
        &self,
        target: &WatchTarget,
        options: RecordOptions,
    ) -> CoreResult<RecordOutcome> {
        let guard = self.store.lock(&target.path).await;
        let content = self.read(target).await?;
        Ok(self.store.record_locked(&guard, &content, options).await?)
    }

    /// Atomically replace the live content of a target.
    pub async fn write(&self, target: &WatchTarget, content: &[u8]) -> CoreResult<()> {
        atomic::replace_file(&target.path, content)
            .await
            .map_err(|e| match e {
                StorageError::Io(source) => CoreError::io(&target.path, source),
                other => CoreError::Storage(other),
            })
    }
}

/// Paths go out as text; bytes that are not UTF-8 are replaced.
fn display_path<S: serde::Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&path.display())
}
