//! Long-running commands: the HTTP server and the standalone watcher.

use anyhow::Context;
use confwatch_core::Engine;
use confwatch_server::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Serve the HTTP API until Ctrl-C.
///
/// The file watcher runs alongside the server when `watch` is set and the
/// configuration enables it.
pub async fn run_server(
    engine: Engine,
    address: Option<String>,
    watch: bool,
) -> anyhow::Result<()> {
    let address = address.unwrap_or_else(|| engine.config().server.address());

    let watcher = if watch && engine.config().watcher.enabled {
        Some(engine.start_watcher().await?)
    } else {
        info!("File watcher disabled");
        None
    };

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    let local = listener.local_addr()?;

    println!();
    println!("  ConfWatch API:  http://{}", local);
    println!("  Watching:       {} file(s)", engine.registry().targets().len());
    println!("  Press Ctrl-C to stop.");
    println!();

    let state = AppState::from_shared(Arc::new(engine));
    let result = confwatch_server::serve(listener, state, shutdown_signal()).await;

    if let Some(watcher) = watcher {
        watcher.shutdown().await;
    }
    result.context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Watch the configured files until Ctrl-C.
pub async fn run_watch(engine: Engine) -> anyhow::Result<()> {
    if engine.registry().targets().is_empty() {
        anyhow::bail!("No files are configured under `watch`");
    }

    let watcher = engine.start_watcher().await?;
    println!(
        "Watching {} file(s) in {} director{}. Press Ctrl-C to stop.",
        engine.registry().targets().len(),
        watcher.directories().len(),
        if watcher.directories().len() == 1 { "y" } else { "ies" }
    );

    shutdown_signal().await;
    watcher.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await
        }
    }
}
