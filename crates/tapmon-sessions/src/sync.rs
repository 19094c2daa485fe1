//! Background sync loop: the single writer of the session table.
//!
//! Each tick runs scan -> pair -> stale-check -> parse -> upsert, then prunes
//! table entries whose files disappeared from disk. Ticks are exposed as
//! [`SyncWorker::run_once`] so tests drive one iteration deterministically;
//! [`SyncWorker::run`] wraps it in the sleep/backoff loop with a shutdown
//! signal.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::error::SessionError;
use crate::parser::load_session;
use crate::scanner::{is_stale, scan_sessions, FilePattern};
use crate::table::SessionTable;
use crate::types::SessionId;

/// Events emitted as the watched directory changes. Feeds the SSE endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionDiscovered { id: SessionId },
    SessionUpdated { id: SessionId },
    SessionRemoved { id: SessionId },
}

/// Everything the worker needs, passed at construction instead of read from
/// ambient state.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub samples_dir: PathBuf,
    pub best_pattern: FilePattern,
    pub history_pattern: FilePattern,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
}

impl SyncConfig {
    pub fn new(samples_dir: PathBuf) -> Self {
        Self {
            samples_dir,
            best_pattern: FilePattern::new("best_bpm_ur_", ".csv"),
            history_pattern: FilePattern::new("stats_history_", ".csv"),
            poll_interval: Duration::from_secs(2),
            error_backoff: Duration::from_secs(5),
        }
    }
}

/// What one tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub scanned: usize,
    pub reloaded: usize,
    pub removed: usize,
}

type PurgeHook = Box<dyn Fn(&SessionId) + Send + Sync>;

pub struct SyncWorker {
    config: SyncConfig,
    table: Arc<SessionTable>,
    events: broadcast::Sender<SessionEvent>,
    /// Last observed max mtime per session id; the staleness baseline.
    seen: HashMap<SessionId, SystemTime>,
    purge_hook: Option<PurgeHook>,
}

impl SyncWorker {
    pub fn new(
        config: SyncConfig,
        table: Arc<SessionTable>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            config,
            table,
            events,
            seen: HashMap::new(),
            purge_hook: None,
        }
    }

    /// Install a callback invoked when a session's files vanish from disk,
    /// so its cached artifacts can be purged along with the table entry.
    pub fn with_purge_hook(mut self, hook: PurgeHook) -> Self {
        self.purge_hook = Some(hook);
        self
    }

    /// One deterministic tick. An unreadable directory is returned as an
    /// error (the loop backs off); a malformed session is skipped with a
    /// warning and marked seen so it isn't re-parsed until its mtime moves.
    pub fn run_once(&mut self) -> Result<SyncOutcome, SessionError> {
        let found = scan_sessions(
            &self.config.samples_dir,
            &self.config.best_pattern,
            &self.config.history_pattern,
        )?;

        let mut outcome = SyncOutcome {
            scanned: found.len(),
            ..Default::default()
        };

        let mut present: HashSet<SessionId> = HashSet::with_capacity(found.len());
        for files in &found {
            present.insert(files.id.clone());

            let previous = self.seen.get(&files.id).copied();
            if !is_stale(previous, files.last_modified) {
                continue;
            }

            self.seen.insert(files.id.clone(), files.last_modified);
            match load_session(files) {
                Ok(session) => {
                    self.table.upsert(session);
                    outcome.reloaded += 1;
                    let event = if previous.is_none() {
                        SessionEvent::SessionDiscovered {
                            id: files.id.clone(),
                        }
                    } else {
                        SessionEvent::SessionUpdated {
                            id: files.id.clone(),
                        }
                    };
                    let _ = self.events.send(event);
                }
                Err(e) => {
                    tracing::warn!("Skipping session {}: {}", files.id, e);
                }
            }
        }

        // Files deleted out from under us (externally or via the delete
        // endpoint): drop the table rows and cached artifacts too.
        let gone: Vec<SessionId> = self
            .seen
            .keys()
            .filter(|id| !present.contains(*id))
            .cloned()
            .collect();
        for id in gone {
            self.seen.remove(&id);
            if let Some(hook) = &self.purge_hook {
                hook(&id);
            }
            if self.table.delete(&id).is_some() {
                outcome.removed += 1;
                let _ = self.events.send(SessionEvent::SessionRemoved { id });
            }
        }

        Ok(outcome)
    }

    /// The poll loop. Sleeps `poll_interval` between ticks, `error_backoff`
    /// after a failed scan; exits only when the shutdown signal flips.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Watching {:?} every {:?}",
            self.config.samples_dir,
            self.config.poll_interval
        );

        loop {
            let delay = match self.run_once() {
                Ok(outcome) => {
                    if outcome.reloaded > 0 || outcome.removed > 0 {
                        tracing::debug!(
                            "Sync tick: {} scanned, {} reloaded, {} removed (table v{})",
                            outcome.scanned,
                            outcome.reloaded,
                            outcome.removed,
                            self.table.version()
                        );
                    }
                    self.config.poll_interval
                }
                Err(e) => {
                    tracing::warn!("Scan failed, backing off: {}", e);
                    self.config.error_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!("Sync loop stopped");
    }
}
