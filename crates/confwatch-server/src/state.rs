//! Server state.

use confwatch_core::Engine;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The versioning engine.
    pub engine: Arc<Engine>,
}

impl AppState {
    /// Create new application state.
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Share an engine that is also used elsewhere (e.g. by the watcher).
    pub fn from_shared(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}
