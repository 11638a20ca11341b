//! Test fixtures for creating reproducible hosts.
//!
//! A host is a temporary directory holding some configuration files to
//! watch, plus a separate `store/` directory for snapshots.

use confwatch_core::Config;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Debounce used by fixture configs, short enough for watcher tests.
pub const TEST_DEBOUNCE_MS: u64 = 50;

/// Builder for a temporary host.
///
/// # Example
///
/// ```rust
/// use confwatch_test_utils::fixtures::TestHost;
///
/// let host = TestHost::new()
///     .with_file("app.env", "A=1\n")
///     .with_missing("later.conf")
///     .build();
///
/// assert!(host.file("app.env").exists());
/// assert!(!host.file("later.conf").exists());
/// assert_eq!(host.config().watch.len(), 2);
/// ```
pub struct TestHost {
    temp_dir: TempDir,
    /// Watched files in configuration order; `None` content means absent.
    files: Vec<(PathBuf, Option<String>)>,
}

impl TestHost {
    /// Create a new host builder.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            files: Vec::new(),
        }
    }

    /// Add a watched file with initial contents.
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.files
            .push((path.as_ref().to_path_buf(), Some(contents.into())));
        self
    }

    /// Add a watched path that does not exist yet.
    pub fn with_missing(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push((path.as_ref().to_path_buf(), None));
        self
    }

    /// Build the host, creating all files.
    pub fn build(self) -> BuiltTestHost {
        // Canonical root so paths compare equal to what the engine resolves.
        let root = self
            .temp_dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp directory");

        let mut watched = Vec::with_capacity(self.files.len());
        for (path, contents) in &self.files {
            let full_path = root.join(path);
            if let Some(contents) = contents {
                if let Some(parent) = full_path.parent() {
                    fs::create_dir_all(parent).unwrap_or_else(|e| {
                        panic!(
                            "Failed to create parent directory for {}: {}",
                            full_path.display(),
                            e
                        )
                    });
                }
                fs::write(&full_path, contents).unwrap_or_else(|e| {
                    panic!("Failed to write file {}: {}", full_path.display(), e)
                });
            }
            watched.push(full_path);
        }

        BuiltTestHost {
            _temp_dir: self.temp_dir,
            root,
            watched,
        }
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

/// A built host with files created on disk.
///
/// The temporary directory is removed when this is dropped.
pub struct BuiltTestHost {
    _temp_dir: TempDir,
    root: PathBuf,
    watched: Vec<PathBuf>,
}

impl BuiltTestHost {
    /// Canonical root of the host directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a file under the host root.
    pub fn file(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path.as_ref())
    }

    /// The watch entry (display name) of a file.
    pub fn name(&self, path: impl AsRef<Path>) -> String {
        self.file(path).display().to_string()
    }

    /// All watched paths, in configuration order.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    /// Directory used for snapshot storage.
    pub fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }

    /// Configuration watching every fixture file with storage in `store/`.
    pub fn config(&self) -> Config {
        let mut config = Config {
            watch: self
                .watched
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            ..Config::default()
        };
        config.storage.path = Some(self.store_dir().display().to_string());
        config.watcher.debounce_ms = TEST_DEBOUNCE_MS;
        config
    }

    /// Write [`BuiltTestHost::config`] as YAML and return its path.
    pub fn write_config(&self) -> PathBuf {
        let path = self.root.join("config.yml");
        let yaml = serde_yaml::to_string(&self.config()).expect("Failed to serialize config");
        fs::write(&path, yaml)
            .unwrap_or_else(|e| panic!("Failed to write config {}: {}", path.display(), e));
        path
    }

    /// Read a file from the host.
    pub fn read_file(&self, path: impl AsRef<Path>) -> String {
        let full_path = self.file(path);
        fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("Failed to read file {}: {}", full_path.display(), e))
    }

    /// Overwrite a file on the host.
    pub fn write_file(&self, path: impl AsRef<Path>, contents: impl AsRef<str>) {
        let full_path = self.file(path);
        fs::write(&full_path, contents.as_ref())
            .unwrap_or_else(|e| panic!("Failed to write file {}: {}", full_path.display(), e));
    }

    /// Delete a file from the host.
    pub fn delete_file(&self, path: impl AsRef<Path>) {
        let full_path = self.file(path);
        fs::remove_file(&full_path)
            .unwrap_or_else(|e| panic!("Failed to delete file {}: {}", full_path.display(), e));
    }
}
