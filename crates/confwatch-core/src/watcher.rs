//! Automatic snapshots on file change.
//!
//! Watches the parent directory of every target (editors usually replace
//! files by rename, which a watch on the file itself would lose), filters
//! events down to the configured paths and records a snapshot once a file
//! has been quiet for the debounce window.

use crate::error::{CoreError, CoreResult};
use crate::registry::FileRegistry;
use confwatch_snapshot::RecordOptions;
use confwatch_storage::Storage;
use confwatch_util::path;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Comment on snapshots recorded after a detected change.
pub const AUTO_COMMENT: &str = "[AUTO] File modified";

/// Comment on the snapshot taken for each file when watching starts.
pub const BASELINE_COMMENT: &str = "[AUTO] Initial snapshot";

/// Per-path trailing-edge debounce.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Note a change; pushes the path's deadline out to `now + window`.
    pub fn touch(&mut self, path: PathBuf, now: Instant) {
        self.pending.insert(path, now + self.window);
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every path whose deadline has passed, sorted.
    pub fn take_due(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &due {
            self.pending.remove(path);
        }
        due.sort();
        due
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// A running file watcher. Stops on [`FileWatcher::shutdown`] or drop.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    directories: Vec<PathBuf>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl FileWatcher {
    /// Capture a baseline for every existing target, then start watching.
    pub async fn start<S: Storage + 'static>(
        registry: Arc<FileRegistry<S>>,
        debounce: Duration,
    ) -> CoreResult<Self> {
        capture_baseline(&registry).await;

        let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        for path in event.paths {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => error!(error = %e, "File watching error"),
            },
            notify::Config::default(),
        )?;

        let parents: BTreeSet<PathBuf> = registry
            .targets()
            .iter()
            .filter_map(|t| t.path.parent().map(Path::to_path_buf))
            .collect();

        let mut directories = Vec::new();
        for dir in parents {
            if !dir.is_dir() {
                warn!(dir = %dir.display(), "Parent directory missing, not watching");
                continue;
            }
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            debug!(dir = %dir.display(), "Watching directory");
            directories.push(dir);
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_loop(registry, debounce, rx, shutdown_rx));

        info!(
            directories = directories.len(),
            debounce_ms = debounce.as_millis() as u64,
            "File watcher started"
        );

        Ok(Self {
            _watcher: watcher,
            directories,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Directories being watched.
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Stop watching and wait for the event loop to finish.
    ///
    /// Changes still inside their debounce window are dropped.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Watcher task ended abnormally");
            }
        }
        info!("File watcher stopped");
    }
}

async fn run_loop<S: Storage>(
    registry: Arc<FileRegistry<S>>,
    debounce: Duration,
    mut events: mpsc::UnboundedReceiver<PathBuf>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut debouncer = Debouncer::new(debounce);

    loop {
        let deadline = debouncer.next_deadline();
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Some(raw) => {
                    if let Some(target) = match_target(&registry, &raw) {
                        debug!(path = %target.display(), "Change detected");
                        debouncer.touch(target, Instant::now());
                    }
                }
                None => break,
            },
            _ = wait_until(deadline) => {
                for path in debouncer.take_due(Instant::now()) {
                    let options = RecordOptions::watch().with_comment(Some(AUTO_COMMENT));
                    capture(&registry, &path, options).await;
                }
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn match_target<S: Storage>(registry: &FileRegistry<S>, raw: &Path) -> Option<PathBuf> {
    registry
        .target_for(raw)
        .or_else(|| registry.target_for(&path::canonical(raw)))
        .map(|t| t.path.clone())
}

async fn capture_baseline<S: Storage>(registry: &FileRegistry<S>) {
    for target in registry.targets() {
        let options = RecordOptions::watch().with_comment(Some(BASELINE_COMMENT));
        capture(registry, &target.path, options).await;
    }
}

async fn capture<S: Storage>(
    registry: &FileRegistry<S>,
    path: &Path,
    options: RecordOptions,
) {
    let Some(target) = registry.target_for(path) else {
        return;
    };

    match registry.capture(target, options).await {
        Ok(outcome) if outcome.is_created() => {
            info!(path = %path.display(), hash = %outcome.snapshot().hash, "Created automatic snapshot");
        }
        Ok(_) => debug!(path = %path.display(), "No changes detected"),
        Err(CoreError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "File no longer exists");
        }
        Err(CoreError::Io { source, .. }) => {
            warn!(path = %path.display(), error = %source, "Failed to read watched file");
        }
        Err(e) => error!(path = %path.display(), error = %e, "Failed to record snapshot"),
    }
}
