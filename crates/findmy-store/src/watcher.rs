//! Directory watcher over the record store root.
//!
//! Wraps notify's recommended watcher: recursive watch, create/modify
//! filtering, and a channel handoff to the ingest worker. Events may arrive
//! for irrelevant paths; the ingestor filters by category prefix.
//!
//! `stop()` is explicit and must precede drop during orderly shutdown; a
//! stopped watcher can be dropped safely from any thread.

use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Watches the record store root and forwards changed paths.
pub struct StoreWatcher {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
}

impl StoreWatcher {
    /// A watcher for `root`, not yet started.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            watcher: None,
        }
    }

    /// Start watching; changed paths are sent to `tx`. The channel send
    /// happens on notify's own thread, so a full channel applies
    /// backpressure to event delivery, not to the caller.
    pub fn start(&mut self, tx: mpsc::Sender<PathBuf>) -> Result<()> {
        if self.watcher.is_some() {
            anyhow::bail!("watcher already started");
        }

        let mut watcher =
            notify::recommended_watcher(move |result: std::result::Result<Event, notify::Error>| {
                match result {
                    Ok(event) => {
                        if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                            for path in event.paths {
                                debug!(path = %path.display(), "file change detected");
                                if let Err(e) = tx.blocking_send(path) {
                                    warn!(error = %e, "failed to queue file change event");
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "directory watcher error");
                    }
                }
            })
            .context("failed to create directory watcher")?;

        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", self.root.display()))?;

        info!(root = %self.root.display(), "watching record store");
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Stop watching. Safe to call repeatedly; redundant calls are no-ops.
    pub fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            let _ = watcher.unwatch(&self.root);
            info!(root = %self.root.display(), "stopped watching record store");
        }
    }

    /// Whether the watcher is currently running.
    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }
}
