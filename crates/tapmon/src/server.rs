//! Wires the pieces together and runs the HTTP server: session table, name
//! store, artifact cache, the background sync loop, and the axum router.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, watch};

use tapmon_render::{ArtifactCache, SvgRenderer};
use tapmon_sessions::{NameStore, SessionTable, SyncConfig, SyncWorker};

use crate::api;
use crate::config::ProjectConfig;

pub async fn run(config: ProjectConfig, open_browser: bool) -> Result<()> {
    std::fs::create_dir_all(&config.samples_dir)
        .with_context(|| format!("Failed to create {}", config.samples_dir.display()))?;

    let table = Arc::new(SessionTable::new());
    let names = Arc::new(NameStore::load(config.names_file.clone()));

    let mut cache = ArtifactCache::new(config.cache_limits());
    if let Some(dir) = &config.artifacts_dir {
        cache = cache.with_disk_dir(dir.clone());
    }
    let cache = Arc::new(cache);
    let renderer = Arc::new(SvgRenderer::default());

    let (events, _) = broadcast::channel(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sync_config = SyncConfig {
        samples_dir: config.samples_dir.clone(),
        poll_interval: config.poll_interval(),
        error_backoff: config.error_backoff(),
        ..SyncConfig::new(config.samples_dir.clone())
    };
    let best_pattern = sync_config.best_pattern.clone();
    let history_pattern = sync_config.history_pattern.clone();

    let hook_cache = Arc::clone(&cache);
    let worker = SyncWorker::new(sync_config, Arc::clone(&table), events.clone())
        .with_purge_hook(Box::new(move |id| {
            hook_cache.purge(id);
        }));
    let worker_handle = tokio::spawn(worker.run(shutdown_rx));

    let state = api::AppState {
        table,
        names,
        cache,
        renderer,
        events,
        samples_dir: config.samples_dir.clone(),
        best_pattern,
        history_pattern,
        snapshot_max: config.snapshot_max,
        render_timeout: config.render_timeout(),
    };
    let router = api::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind server to {}", addr))?;

    let url = format!("http://localhost:{}", config.port);
    eprintln!();
    eprintln!("  -> Watching {}", config.samples_dir.display());
    eprintln!("  -> Open {}", url);
    eprintln!("  -> Press Ctrl+C to stop");
    eprintln!();

    if open_browser {
        if let Err(e) = open::that(&url) {
            eprintln!("Failed to open browser: {} (open {} manually)", e, url);
        }
    }

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Stop the sync loop before exiting so a mid-tick write finishes.
    let _ = shutdown_tx.send(true);
    let _ = worker_handle.await;

    result.context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    eprintln!("\nShutting down...");
}
