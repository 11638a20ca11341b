//! Snapshot data structures.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Content-addressed identity of a snapshot: the hex SHA-256 of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Number of characters shown in diff headers.
    pub const SHORT_LEN: usize = 12;

    /// Hash the given content.
    pub fn of(content: &[u8]) -> Self {
        Self(confwatch_storage::digest(content))
    }

    /// Wrap an already computed hex digest.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Get the hash as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first `len` characters of the hash.
    pub fn prefix(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Abbreviated form used in diff headers.
    pub fn short(&self) -> &str {
        self.prefix(Self::SHORT_LEN)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What caused a snapshot to be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotAction {
    /// Explicit capture from the CLI or the API.
    #[default]
    Capture,
    /// Change detected by the file watcher.
    Watch,
    /// Content restored from an earlier snapshot.
    Rollback,
}

impl SnapshotAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotAction::Capture => "capture",
            SnapshotAction::Watch => "watch",
            SnapshotAction::Rollback => "rollback",
        }
    }
}

/// An immutable capture of a watched file's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Position in the file's history, starting at 1.
    pub seq: u64,

    /// Canonical absolute path of the watched file.
    pub path: PathBuf,

    /// Digest of the captured content.
    pub hash: ContentHash,

    /// Capture instant; strictly increasing within one file's history.
    pub timestamp: DateTime<Utc>,

    /// What caused the capture.
    #[serde(default)]
    pub action: SnapshotAction,

    /// Free-text annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Size of the captured content in bytes.
    pub size: u64,
}

impl Snapshot {
    /// ISO-8601 rendering of the timestamp, UTC with microseconds.
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Derived label, e.g. `Snapshot: /etc/hosts at 2024-05-01T10:00:00.000000Z`.
    pub fn subject(&self) -> String {
        format!(
            "Snapshot: {} at {}",
            self.path.display(),
            self.timestamp_iso()
        )
    }

    /// Two-part message: the subject line, then the comment (if any).
    pub fn message(&self) -> String {
        match self.comment.as_deref().filter(|c| !c.is_empty()) {
            Some(comment) => format!("{}\n{}", self.subject(), comment),
            None => self.subject(),
        }
    }
}

/// The persisted history of one watched file, oldest entry first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryLog {
    pub path: PathBuf,
    #[serde(default)]
    pub entries: Vec<Snapshot>,
    /// Named versions: tag name to the hash it was attached to.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, ContentHash>,
}

impl HistoryLog {
    /// Create an empty history for a file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    /// The most recent entry.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.entries.last()
    }
}
