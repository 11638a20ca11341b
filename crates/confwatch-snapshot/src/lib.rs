//! Snapshot versioning for confwatch.
//!
//! This crate keeps an append-only, content-addressed history per watched
//! file and computes differences between any two recorded states:
//! - Record a file's content (no-op when unchanged since the last entry)
//! - List a file's history, oldest first
//! - Fetch the content of any historical entry by hash or hash prefix
//! - Unified diffs between two snapshots or the working copy and the latest
//!
//! # Example
//!
//! ```no_run
//! use confwatch_snapshot::{DiffEngine, SnapshotStore};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SnapshotStore::open("/var/lib/confwatch").await?);
//! let path = Path::new("/etc/app.env");
//!
//! let first = store.record_snapshot(path, b"A=1\n", None).await?;
//! let second = store.record_snapshot(path, b"A=2\n", None).await?;
//!
//! let diff = DiffEngine::new(store.clone())
//!     .diff_between(path, first.hash.as_str(), second.hash.as_str())
//!     .await?;
//! assert!(diff.contains("+A=2"));
//! # Ok(())
//! # }
//! ```

mod diff;
mod error;
mod lock;
mod snapshot;
mod store;

pub use diff::{is_binary, unified_diff, DiffEngine};
pub use error::{SnapshotError, SnapshotResult};
pub use lock::{PathGuard, PathLocks};
pub use snapshot::{ContentHash, HistoryLog, Snapshot, SnapshotAction};
pub use store::{RecordOptions, RecordOutcome, SnapshotStore, MIN_PREFIX_LEN};
