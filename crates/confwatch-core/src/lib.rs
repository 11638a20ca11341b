//! Core engine for confwatch.
//!
//! This crate ties the snapshot store to the host:
//! - Configuration loading (YAML)
//! - File Registry: configured watch-paths resolved to canonical paths
//! - History Query Service
//! - Rollback Coordinator (restore, then record)
//! - File watcher taking automatic snapshots
//! - [`Engine`], the facade used by the CLI and the HTTP server

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod registry;
pub mod rollback;
pub mod watcher;

pub use config::Config;
pub use engine::Engine;
pub use error::{ConfigError, ConfigResult, CoreError, CoreResult, ErrorKind};
pub use history::{HistoryRecord, HistoryService};
pub use registry::{FileRegistry, WatchTarget, WatchedFile};
pub use rollback::{RollbackCoordinator, RollbackOutcome, RollbackState};
pub use watcher::FileWatcher;
