//! Snapshot storage implementation.

use crate::{
    ContentHash, HistoryLog, PathGuard, PathLocks, Snapshot, SnapshotAction, SnapshotError,
    SnapshotResult,
};
use chrono::{DateTime, Duration, Utc};
use confwatch_storage::{JsonStorage, ObjectStore, Storage};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Shortest hash prefix accepted when looking up a snapshot.
pub const MIN_PREFIX_LEN: usize = 4;

/// Options for recording a snapshot.
#[derive(Debug, Clone, Default)]
pub struct RecordOptions {
    /// Free-text annotation stored with the entry.
    pub comment: Option<String>,
    /// What caused the capture.
    pub action: SnapshotAction,
    /// Append even when the content equals the latest entry.
    pub force: bool,
}

impl RecordOptions {
    /// Options for an explicit capture.
    pub fn capture() -> Self {
        Self::default()
    }

    /// Options for a watcher-triggered capture.
    pub fn watch() -> Self {
        Self {
            action: SnapshotAction::Watch,
            ..Self::default()
        }
    }

    /// Options for the entry appended after a rollback. Always appends.
    pub fn rollback(comment: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
            action: SnapshotAction::Rollback,
            force: true,
        }
    }

    /// Set the comment; blank comments are dropped.
    pub fn with_comment(mut self, comment: Option<impl Into<String>>) -> Self {
        self.comment = comment.map(Into::into).filter(|c: &String| !c.trim().is_empty());
        self
    }

    /// Set the force flag.
    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Result of a record call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new entry was appended.
    Created(Snapshot),
    /// Content matched the latest entry; nothing was written.
    Unchanged(Snapshot),
}

impl RecordOutcome {
    /// The resulting latest snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            RecordOutcome::Created(s) | RecordOutcome::Unchanged(s) => s,
        }
    }

    /// Consume into the resulting latest snapshot.
    pub fn into_snapshot(self) -> Snapshot {
        match self {
            RecordOutcome::Created(s) | RecordOutcome::Unchanged(s) => s,
        }
    }

    /// Whether a new entry was appended.
    pub fn is_created(&self) -> bool {
        matches!(self, RecordOutcome::Created(_))
    }
}

/// Append-only, content-addressed history store.
///
/// Contents live in an [`ObjectStore`]; the per-file histories are small
/// JSON documents in a [`Storage`] backend:
/// ```text
/// base_dir/
///   objects/
///     <hh>/<rest>          # file contents, keyed by SHA-256
///   history/
///     <sha256(path)>.json  # {path, entries: [...]}, oldest first
/// ```
///
/// Writes for one path are serialized through [`PathLocks`]; a history
/// document is replaced atomically, so readers never need the lock.
pub struct SnapshotStore<S = JsonStorage> {
    index: S,
    objects: ObjectStore,
    locks: PathLocks,
}

impl SnapshotStore<JsonStorage> {
    /// Open (or create) a file-backed store rooted at `base_dir`.
    pub async fn open(base_dir: impl Into<PathBuf>) -> SnapshotResult<Self> {
        let base_dir = base_dir.into();
        let history_dir = base_dir.join("history");
        let objects_dir = base_dir.join("objects");

        fs::create_dir_all(&history_dir)
            .await
            .map_err(|e| SnapshotError::io(&history_dir, e))?;
        fs::create_dir_all(&objects_dir)
            .await
            .map_err(|e| SnapshotError::io(&objects_dir, e))?;

        debug!(base_dir = %base_dir.display(), "Opened snapshot store");

        Ok(Self::with_storage(
            JsonStorage::new(history_dir),
            ObjectStore::new(objects_dir),
        ))
    }
}

impl<S: Storage> SnapshotStore<S> {
    /// Build a store from explicit backends.
    pub fn with_storage(index: S, objects: ObjectStore) -> Self {
        Self {
            index,
            objects,
            locks: PathLocks::new(),
        }
    }

    /// Record `content` for `path` with an optional comment.
    ///
    /// Returns the latest snapshot afterwards; when the content equals the
    /// latest entry nothing is appended and that entry is returned.
    pub async fn record_snapshot(
        &self,
        path: &Path,
        content: &[u8],
        comment: Option<&str>,
    ) -> SnapshotResult<Snapshot> {
        let options = RecordOptions::capture().with_comment(comment);
        Ok(self.record(path, content, options).await?.into_snapshot())
    }

    /// Record `content` for `path` with full control over the entry.
    pub async fn record(
        &self,
        path: &Path,
        content: &[u8],
        options: RecordOptions,
    ) -> SnapshotResult<RecordOutcome> {
        let guard = self.lock(path).await;
        self.record_locked(&guard, content, options).await
    }

    /// Take the write lock for `path`.
    ///
    /// Hold the guard across a multi-step mutation and record through
    /// [`SnapshotStore::record_locked`]. Calling [`SnapshotStore::record`] for
    /// the same path while holding the guard deadlocks.
    pub async fn lock(&self, path: &Path) -> PathGuard {
        self.locks.lock(path).await
    }

    /// Record while already holding the path's write lock.
    pub async fn record_locked(
        &self,
        guard: &PathGuard,
        content: &[u8],
        options: RecordOptions,
    ) -> SnapshotResult<RecordOutcome> {
        let path = guard.path();
        let mut log = self.load(path).await?;
        let hash = ContentHash::of(content);

        if let Some(latest) = log.latest() {
            if latest.hash == hash && !options.force {
                debug!(path = %path.display(), hash = %hash, "Content unchanged, skipping snapshot");
                return Ok(RecordOutcome::Unchanged(latest.clone()));
            }
        }

        // Object first: an index entry must never point at a missing blob.
        self.objects.put(content).await?;

        let snapshot = Snapshot {
            seq: log.latest().map_or(1, |s| s.seq + 1),
            path: path.to_path_buf(),
            hash,
            timestamp: next_timestamp(log.latest().map(|s| s.timestamp)),
            action: options.action,
            comment: options.comment,
            size: content.len() as u64,
        };

        log.path = path.to_path_buf();
        log.entries.push(snapshot.clone());
        self.index.write(&[&history_key(path)], &log).await?;

        info!(
            path = %path.display(),
            hash = %snapshot.hash,
            seq = snapshot.seq,
            action = snapshot.action.as_str(),
            "Recorded snapshot"
        );

        Ok(RecordOutcome::Created(snapshot))
    }

    /// All snapshots of `path`, oldest first. Empty for unknown paths.
    pub async fn history(&self, path: &Path) -> SnapshotResult<Vec<Snapshot>> {
        Ok(self.load(path).await?.entries)
    }

    /// Number of snapshots recorded for `path`.
    pub async fn history_len(&self, path: &Path) -> SnapshotResult<usize> {
        Ok(self.load(path).await?.entries.len())
    }

    /// The most recent snapshot of `path`.
    pub async fn latest(&self, path: &Path) -> SnapshotResult<Option<Snapshot>> {
        Ok(self.load(path).await?.entries.pop())
    }

    /// Name the latest snapshot of `path`.
    ///
    /// Tag names are per file, may not contain whitespace and are never
    /// moved once set.
    pub async fn tag(&self, path: &Path, name: &str) -> SnapshotResult<Snapshot> {
        let name = check_tag_name(name)?;
        let guard = self.lock(path).await;
        let mut log = self.load(guard.path()).await?;

        let latest = log
            .latest()
            .cloned()
            .ok_or_else(|| SnapshotError::NoHistory {
                path: path.to_path_buf(),
            })?;
        if log.tags.contains_key(name) {
            return Err(SnapshotError::InvalidTag {
                name: name.to_string(),
                reason: "already exists",
            });
        }

        log.path = path.to_path_buf();
        log.tags.insert(name.to_string(), latest.hash.clone());
        self.index.write(&[&history_key(path)], &log).await?;

        info!(path = %path.display(), tag = name, hash = %latest.hash, "Tagged snapshot");
        Ok(latest)
    }

    /// Tags of `path`, by name.
    pub async fn tags(&self, path: &Path) -> SnapshotResult<BTreeMap<String, ContentHash>> {
        Ok(self.load(path).await?.tags)
    }

    /// Resolve a tag name, a full hash or a unique hash prefix within the
    /// history of `path`. Tags take precedence over prefixes.
    ///
    /// The same content may appear several times in a history; those
    /// entries share one hash and count as a single match.
    pub async fn resolve_hash(&self, path: &Path, hash: &str) -> SnapshotResult<ContentHash> {
        let log = self.load(path).await?;
        if let Some(tagged) = log.tags.get(hash.trim()) {
            return Ok(tagged.clone());
        }

        let needle = hash.trim().to_ascii_lowercase();
        if needle.len() < MIN_PREFIX_LEN {
            return Err(SnapshotError::not_found(path, hash));
        }

        let matches: Vec<&ContentHash> = log
            .entries
            .iter()
            .map(|s| &s.hash)
            .filter(|h| h.as_str().starts_with(&needle))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        match matches.as_slice() {
            [] => Err(SnapshotError::not_found(path, hash)),
            [only] => Ok((*only).clone()),
            many => Err(SnapshotError::AmbiguousHash {
                prefix: needle,
                candidates: many.len(),
            }),
        }
    }

    /// Content of the snapshot identified by `hash` (or a unique prefix).
    ///
    /// Fails with [`SnapshotError::NotFound`] when the hash is not part of
    /// this file's history, even if another file recorded the same bytes.
    pub async fn content_at(&self, path: &Path, hash: &str) -> SnapshotResult<Vec<u8>> {
        let resolved = self.resolve_hash(path, hash).await?;
        Ok(self.objects.get(resolved.as_str()).await?)
    }

    /// Paths that have at least one recorded snapshot.
    pub async fn tracked_paths(&self) -> SnapshotResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for key in self.index.list(&[]).await? {
            let key: Vec<&str> = key.iter().map(String::as_str).collect();
            if let Some(log) = self.index.read::<HistoryLog>(&key).await? {
                if !log.entries.is_empty() {
                    paths.push(log.path);
                }
            }
        }
        paths.sort();
        Ok(paths)
    }

    async fn load(&self, path: &Path) -> SnapshotResult<HistoryLog> {
        Ok(self
            .index
            .read::<HistoryLog>(&[&history_key(path)])
            .await?
            .unwrap_or_else(|| HistoryLog::new(path)))
    }
}

/// Storage key of a file's history: the digest of its path.
fn history_key(path: &Path) -> String {
    confwatch_storage::digest(path.as_os_str().as_encoded_bytes())
}

fn check_tag_name(name: &str) -> SnapshotResult<&str> {
    let name = name.trim();
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        "must not contain whitespace"
    } else {
        return Ok(name);
    };
    Err(SnapshotError::InvalidTag {
        name: name.to_string(),
        reason,
    })
}

/// `now`, pushed forward when needed so timestamps strictly increase.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}
