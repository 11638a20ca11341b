//! Unified diffs between snapshots and live files.

use crate::{ContentHash, SnapshotError, SnapshotResult, SnapshotStore};
use confwatch_storage::{JsonStorage, Storage};
use similar::TextDiff;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Lines of unchanged context around each hunk.
const CONTEXT_LINES: usize = 3;

/// Bytes inspected when sniffing for binary content.
const BINARY_SNIFF_LEN: usize = 8000;

/// Whether `content` should be treated as binary rather than text.
pub fn is_binary(content: &[u8]) -> bool {
    let head = &content[..content.len().min(BINARY_SNIFF_LEN)];
    head.contains(&0) || std::str::from_utf8(content).is_err()
}

/// Render a line-based unified diff from `old` to `new`.
///
/// Identical inputs yield an empty string. Binary inputs yield a single
/// `Binary files .. differ` line instead of hunks.
pub fn unified_diff(old: &[u8], new: &[u8], old_label: &str, new_label: &str) -> String {
    if old == new {
        return String::new();
    }

    let (old_text, new_text) = match (text(old), text(new)) {
        (Some(o), Some(n)) => (o, n),
        _ => return format!("Binary files {} and {} differ\n", old_label, new_label),
    };

    TextDiff::from_lines(old_text, new_text)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(old_label, new_label)
        .to_string()
}

fn text(content: &[u8]) -> Option<&str> {
    if is_binary(content) {
        None
    } else {
        std::str::from_utf8(content).ok()
    }
}

/// Header label for a recorded side of a diff.
fn snapshot_label(path: &Path, hash: &ContentHash) -> String {
    format!("{} ({})", path.display(), hash.short())
}

/// Header label for the live file.
fn working_label(path: &Path) -> String {
    format!("{} (working copy)", path.display())
}

/// Computes diffs against the histories held by a [`SnapshotStore`].
pub struct DiffEngine<S = JsonStorage> {
    store: Arc<SnapshotStore<S>>,
}

impl<S> Clone for DiffEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Storage> DiffEngine<S> {
    /// Create a diff engine over `store`.
    pub fn new(store: Arc<SnapshotStore<S>>) -> Self {
        Self { store }
    }

    /// Diff the most recent snapshot of `path` against its current content.
    ///
    /// Empty when the file has not changed since the last snapshot.
    pub async fn diff_working_vs_latest(&self, path: &Path) -> SnapshotResult<String> {
        let working = tokio::fs::read(path)
            .await
            .map_err(|e| SnapshotError::io(path, e))?;

        let latest = self
            .store
            .latest(path)
            .await?
            .ok_or_else(|| SnapshotError::NoHistory {
                path: path.to_path_buf(),
            })?;

        debug!(path = %path.display(), hash = %latest.hash, "Diffing working copy");

        let recorded = self.store.content_at(path, latest.hash.as_str()).await?;
        Ok(unified_diff(
            &recorded,
            &working,
            &snapshot_label(path, &latest.hash),
            &working_label(path),
        ))
    }

    /// Diff two snapshots of `path`, each given by full hash or unique prefix.
    ///
    /// `from` may be newer than `to`; the diff is then simply reversed.
    pub async fn diff_between(&self, path: &Path, from: &str, to: &str) -> SnapshotResult<String> {
        let from = self.store.resolve_hash(path, from).await?;
        let to = self.store.resolve_hash(path, to).await?;

        debug!(path = %path.display(), from = %from, to = %to, "Diffing snapshots");

        let old = self.store.content_at(path, from.as_str()).await?;
        let new = self.store.content_at(path, to.as_str()).await?;
        Ok(unified_diff(
            &old,
            &new,
            &snapshot_label(path, &from),
            &snapshot_label(path, &to),
        ))
    }
}
