//! Path utilities.
//!
//! This module provides utilities for working with file paths.

use std::path::{Component, Path, PathBuf};

/// Get the confwatch configuration directory.
///
/// This follows XDG conventions on Linux/macOS:
/// - `$XDG_CONFIG_HOME/confwatch` if set
/// - `~/.config/confwatch` otherwise
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("confwatch"))
}

/// Get the confwatch data directory.
///
/// This follows XDG conventions:
/// - `$XDG_DATA_HOME/confwatch` if set
/// - `~/.local/share/confwatch` otherwise
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("confwatch"))
}

/// Get the confwatch logs directory.
pub fn logs_dir() -> Option<PathBuf> {
    data_dir().map(|p| p.join("logs"))
}

/// Default location of the configuration file.
pub fn default_config_file() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.yml"))
}

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a leading `~` (and `~user` forms) are returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Normalize a path by removing `.` and `..` components.
///
/// Unlike `canonicalize`, this doesn't require the path to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => {
                result.push(component);
            }
        }
    }

    result
}

/// Make a path absolute against the current directory, then normalize it.
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        let cwd = std::env::current_dir().unwrap_or_default();
        normalize(&cwd.join(path))
    }
}

/// Resolve a path to its canonical, symlink-free absolute form.
///
/// Falls back to canonicalizing the parent directory when the file itself
/// does not exist yet, and to plain normalization when neither exists.
pub fn canonical(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }

    let absolute = absolutize(path);
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(parent) => parent.join(name),
            Err(_) => absolute,
        },
        _ => absolute,
    }
}

/// Expand `~`, then resolve to the canonical absolute path.
pub fn resolve_user_path(path: &str) -> PathBuf {
    canonical(&expand_tilde(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_removes_dots() {
        assert_eq!(
            normalize(Path::new("/etc/./nginx/../hosts")),
            PathBuf::from("/etc/hosts")
        );
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_tilde("~/.bashrc"), home.join(".bashrc"));
        assert_eq!(expand_tilde("~"), home);
        assert_eq!(expand_tilde("/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(expand_tilde("~other/x"), PathBuf::from("~other/x"));
    }

    #[test]
    fn test_absolutize_relative() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolutize(Path::new("a/../b")), normalize(&cwd.join("b")));
    }

    #[test]
    fn test_canonical_resolves_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real.conf");
        std::fs::write(&target, "x=1").unwrap();

        #[cfg(unix)]
        {
            let link = dir.path().join("link.conf");
            std::os::unix::fs::symlink(&target, &link).unwrap();
            assert_eq!(canonical(&link), target.canonicalize().unwrap());
        }
        assert_eq!(canonical(&target), target.canonicalize().unwrap());
    }

    #[test]
    fn test_canonical_missing_file_uses_parent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.conf");
        assert_eq!(
            canonical(&missing),
            dir.path().canonicalize().unwrap().join("missing.conf")
        );
    }
}
