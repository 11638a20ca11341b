//! The engine facade used by the CLI and the HTTP server.

use crate::config::Config;
use crate::error::CoreResult;
use crate::history::{HistoryRecord, HistoryService};
use crate::registry::{FileRegistry, WatchTarget, WatchedFile};
use crate::rollback::{RollbackCoordinator, RollbackOutcome};
use crate::watcher::FileWatcher;
use confwatch_snapshot::{
    ContentHash, DiffEngine, RecordOptions, RecordOutcome, Snapshot, SnapshotStore,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Snapshot versioning engine over one storage directory.
pub struct Engine {
    config: Config,
    storage_dir: PathBuf,
    store: Arc<SnapshotStore>,
    registry: Arc<FileRegistry>,
    history: HistoryService,
    diff: DiffEngine,
    rollback: RollbackCoordinator,
}

impl Engine {
    /// Open the store named by `config` and register its watch targets.
    pub async fn open(config: Config) -> CoreResult<Self> {
        let storage_dir = config.storage_dir()?;
        let store = Arc::new(SnapshotStore::open(&storage_dir).await?);
        let registry = Arc::new(FileRegistry::new(&config.watch, store.clone()));

        info!(
            storage = %storage_dir.display(),
            files = registry.targets().len(),
            "Engine ready"
        );

        Ok(Self {
            history: HistoryService::new(store.clone()),
            diff: DiffEngine::new(store.clone()),
            rollback: RollbackCoordinator::new(registry.clone(), store.clone()),
            config,
            storage_dir,
            store,
            registry,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage_dir(&self) -> &PathBuf {
        &self.storage_dir
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<FileRegistry> {
        &self.registry
    }

    /// Resolve a display name or path to a watch target.
    pub fn resolve(&self, file: &str) -> CoreResult<&WatchTarget> {
        self.registry.resolve(file)
    }

    /// All watched files with live status.
    pub async fn files(&self) -> CoreResult<Vec<WatchedFile>> {
        self.registry.list().await
    }

    /// History of a watched file, oldest first.
    pub async fn history(&self, file: &str) -> CoreResult<Vec<HistoryRecord>> {
        let target = self.registry.resolve(file)?;
        self.history.query(&target.path).await
    }

    /// Working copy against the latest snapshot.
    pub async fn diff_working(&self, file: &str) -> CoreResult<String> {
        let target = self.registry.resolve(file)?;
        Ok(self.diff.diff_working_vs_latest(&target.path).await?)
    }

    /// Two snapshots of a watched file.
    pub async fn diff_between(&self, file: &str, from: &str, to: &str) -> CoreResult<String> {
        let target = self.registry.resolve(file)?;
        Ok(self.diff.diff_between(&target.path, from, to).await?)
    }

    /// Roll a watched file back to an earlier snapshot.
    pub async fn rollback(&self, file: &str, hash: &str) -> CoreResult<RollbackOutcome> {
        self.rollback.rollback(file, hash).await
    }

    /// Record the live content of a watched file.
    pub async fn snapshot(
        &self,
        file: &str,
        comment: Option<&str>,
        force: bool,
    ) -> CoreResult<RecordOutcome> {
        let target = self.registry.resolve(file)?;
        let options = RecordOptions::capture()
            .with_comment(comment)
            .forced(force);
        self.registry.capture(target, options).await
    }

    /// Tag the latest snapshot of a watched file.
    pub async fn tag(&self, file: &str, name: &str) -> CoreResult<Snapshot> {
        let target = self.registry.resolve(file)?;
        Ok(self.store.tag(&target.path, name).await?)
    }

    /// Tags of a watched file, by name.
    pub async fn tags(&self, file: &str) -> CoreResult<BTreeMap<String, ContentHash>> {
        let target = self.registry.resolve(file)?;
        Ok(self.store.tags(&target.path).await?)
    }

    /// Start the file watcher with the configured debounce.
    pub async fn start_watcher(&self) -> CoreResult<FileWatcher> {
        FileWatcher::start(self.registry.clone(), self.config.watcher.debounce()).await
    }

    /// Histories in the store whose path is no longer configured.
    pub async fn orphaned_paths(&self) -> CoreResult<Vec<PathBuf>> {
        Ok(self
            .store
            .tracked_paths()
            .await?
            .into_iter()
            .filter(|p| self.registry.target_for(p).is_none())
            .collect())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("storage_dir", &self.storage_dir)
            .field("targets", &self.registry.targets().len())
            .finish()
    }
}
