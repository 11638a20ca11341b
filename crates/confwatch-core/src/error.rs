//! Error types for the core crate.

use confwatch_snapshot::SnapshotError;
use confwatch_storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested file is not a configured watch target.
    #[error("File not watched: {file}")]
    UnknownFile { file: String },

    /// The referenced snapshot does not belong to the file's history.
    #[error("Snapshot {hash} not found for {}", path.display())]
    NotFound { path: PathBuf, hash: String },

    /// A hash prefix matches several distinct snapshots.
    #[error("Hash prefix {prefix} is ambiguous ({candidates} snapshots match); use a longer hash")]
    AmbiguousHash { prefix: String, candidates: usize },

    /// A tag name is malformed or already taken.
    #[error("Invalid tag {name:?}: {reason}")]
    InvalidTag { name: String, reason: &'static str },

    /// An operation on the latest snapshot ran before any was recorded.
    #[error("No snapshots found for {}", path.display())]
    NoHistory { path: PathBuf },

    /// Reading or writing a live file failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The file watcher could not be set up.
    #[error("watcher error: {0}")]
    Watcher(#[from] notify::Error),
}

impl CoreError {
    /// Wrap an IO error on a live file.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an unknown-file error.
    pub fn unknown_file(file: impl Into<String>) -> Self {
        Self::UnknownFile { file: file.into() }
    }

    /// Classify the error for API consumers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::UnknownFile { .. } => ErrorKind::UnknownFile,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::AmbiguousHash { .. } => ErrorKind::AmbiguousHash,
            CoreError::InvalidTag { .. } => ErrorKind::InvalidTag,
            CoreError::NoHistory { .. } => ErrorKind::NoHistory,
            CoreError::Io { .. } | CoreError::Watcher(_) => ErrorKind::Io,
            CoreError::Storage(_) => ErrorKind::Storage,
            CoreError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<SnapshotError> for CoreError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::NotFound { path, hash } => CoreError::NotFound { path, hash },
            SnapshotError::AmbiguousHash { prefix, candidates } => {
                CoreError::AmbiguousHash { prefix, candidates }
            }
            SnapshotError::InvalidTag { name, reason } => CoreError::InvalidTag { name, reason },
            SnapshotError::NoHistory { path } => CoreError::NoHistory { path },
            SnapshotError::Io { path, source } => CoreError::Io { path, source },
            SnapshotError::Storage(e) => CoreError::Storage(e),
        }
    }
}

/// Machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownFile,
    NotFound,
    AmbiguousHash,
    InvalidTag,
    NoHistory,
    Io,
    Storage,
    Config,
}

impl ErrorKind {
    /// Stable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::UnknownFile => "UNKNOWN_FILE",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::AmbiguousHash => "AMBIGUOUS_HASH",
            ErrorKind::InvalidTag => "INVALID_TAG",
            ErrorKind::NoHistory => "NO_HISTORY",
            ErrorKind::Io => "IO_ERROR",
            ErrorKind::Storage => "STORAGE_ERROR",
            ErrorKind::Config => "CONFIG_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {path}")]
    NotFound { path: String },

    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid YAML syntax or shape.
    #[error("invalid config at {path}: {message}")]
    InvalidYaml { path: String, message: String },

    /// Config validation failed.
    #[error("config validation failed: {message}")]
    Validation { message: String },

    /// Could not determine a standard directory.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_errors_keep_their_kind() {
        let err: CoreError = SnapshotError::not_found("/etc/hosts", "abcd").into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: CoreError = SnapshotError::NoHistory {
            path: PathBuf::from("/etc/hosts"),
        }
        .into();
        assert_eq!(err.kind().code(), "NO_HISTORY");

        let err: CoreError = SnapshotError::AmbiguousHash {
            prefix: "abcd".to_string(),
            candidates: 2,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::AmbiguousHash);

        let err: CoreError = SnapshotError::InvalidTag {
            name: "v 1".to_string(),
            reason: "must not contain whitespace",
        }
        .into();
        assert_eq!(err.kind().code(), "INVALID_TAG");
    }

    #[test]
    fn test_codes() {
        assert_eq!(CoreError::unknown_file("x").kind().code(), "UNKNOWN_FILE");
        let io = CoreError::io("/x", std::io::Error::other("boom"));
        assert_eq!(io.kind().to_string(), "IO_ERROR");
        let config: CoreError = ConfigError::InvalidPath("nowhere".into()).into();
        assert_eq!(config.kind(), ErrorKind::Config);
    }
}
