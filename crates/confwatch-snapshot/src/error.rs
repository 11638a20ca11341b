//! Snapshot error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The hash does not belong to the file's history.
    #[error("Snapshot {hash} not found in history of {}", path.display())]
    NotFound { path: PathBuf, hash: String },

    /// A hash prefix matches more than one distinct snapshot.
    #[error("Hash prefix {prefix} is ambiguous ({candidates} snapshots match); use a longer hash")]
    AmbiguousHash { prefix: String, candidates: usize },

    /// A tag name is malformed or already taken.
    #[error("Invalid tag {name:?}: {reason}")]
    InvalidTag { name: String, reason: &'static str },

    /// An operation on the latest snapshot ran before any was recorded.
    #[error("No snapshots recorded for {}", path.display())]
    NoHistory { path: PathBuf },

    /// IO error on a live file.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Underlying storage failure.
    #[error("Storage error: {0}")]
    Storage(#[from] confwatch_storage::StorageError),
}

impl SnapshotError {
    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>, hash: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            hash: hash.into(),
        }
    }

    /// Wrap an IO error on a live file.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_path_and_hash() {
        let err = SnapshotError::not_found("/etc/hosts", "abc123");
        assert_eq!(
            err.to_string(),
            "Snapshot abc123 not found in history of /etc/hosts"
        );
    }

    #[test]
    fn io_keeps_source() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = SnapshotError::io("/etc/shadow", source);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("/etc/shadow"));
    }
}
