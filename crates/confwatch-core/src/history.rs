//! History queries.

use crate::error::CoreResult;
use chrono::{DateTime, Utc};
use confwatch_snapshot::{ContentHash, Snapshot, SnapshotAction, SnapshotStore};
use confwatch_storage::{JsonStorage, Storage};
use std::path::Path;
use std::sync::Arc;

/// One history entry as presented to clients.
///
/// The text fields are rendered once by [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub seq: u64,
    pub hash: ContentHash,
    pub timestamp: DateTime<Utc>,
    /// ISO-8601 capture time.
    pub date: String,
    pub subject: String,
    /// Subject line, followed by the comment on the next line if present.
    pub message: String,
    pub comment: Option<String>,
    pub action: SnapshotAction,
}

impl From<Snapshot> for HistoryRecord {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            seq: snapshot.seq,
            date: snapshot.timestamp_iso(),
            subject: snapshot.subject(),
            message: snapshot.message(),
            hash: snapshot.hash,
            timestamp: snapshot.timestamp,
            comment: snapshot.comment,
            action: snapshot.action,
        }
    }
}

/// Read-only projection over the snapshot store.
pub struct HistoryService<S = JsonStorage> {
    store: Arc<SnapshotStore<S>>,
}

impl<S: Storage> HistoryService<S> {
    /// Create a service reading from `store`.
    pub fn new(store: Arc<SnapshotStore<S>>) -> Self {
        Self { store }
    }

    /// History of `path` in stored (chronological) order.
    pub async fn query(&self, path: &Path) -> CoreResult<Vec<HistoryRecord>> {
        Ok(self
            .store
            .history(path)
            .await?
            .into_iter()
            .map(HistoryRecord::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_query_preserves_order_and_message() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SnapshotStore::open(dir.path()).await.unwrap());
        let service = HistoryService::new(store.clone());
        let path = Path::new("/tmp/app.env");

        store.record_snapshot(path, b"A=1", None).await.unwrap();
        store
            .record_snapshot(path, b"A=2", Some("bumped A"))
            .await
            .unwrap();

        let records = service.query(path).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].timestamp < records[1].timestamp);
        assert_eq!(records[0].message, records[0].subject);
        assert!(records[0]
            .subject
            .starts_with("Snapshot: /tmp/app.env at "));
        assert_eq!(
            records[1].message,
            format!("{}\nbumped A", records[1].subject)
        );
        assert!(records[1].date.ends_with('Z'));
        assert_eq!(records[1].date, store.history(path).await.unwrap()[1].timestamp_iso());
    }

    #[tokio::test]
    async fn test_query_unknown_is_empty() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SnapshotStore::open(dir.path()).await.unwrap());
        let service = HistoryService::new(store);
        assert!(service
            .query(Path::new("/nowhere"))
            .await
            .unwrap()
            .is_empty());
    }
}
