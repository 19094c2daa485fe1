//! Fingerprint-keyed artifact cache with bounded eviction.
//!
//! A hit returns the stored bytes; a miss renders outside the lock and then
//! inserts. Duplicate renders under a race are wasteful but harmless because
//! rendering is deterministic. When an optional disk directory is set,
//! artifacts survive restarts; an unreadable disk entry is discarded and
//! treated as a miss.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tapmon_sessions::{Session, SessionId};

use crate::fingerprint::Fingerprint;
use crate::{RenderError, Renderer};

/// Eviction bounds. When the entry count exceeds `max_entries`, the
/// `evict_chunk` oldest entries (by insertion order) are removed in one go.
#[derive(Debug, Clone, Copy)]
pub struct CacheLimits {
    pub max_entries: usize,
    pub evict_chunk: usize,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_entries: 100,
            evict_chunk: 20,
        }
    }
}

/// A cached rendered artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub fingerprint: Fingerprint,
    pub bytes: Arc<[u8]>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Entry {
    bytes: Arc<[u8]>,
    /// Insertion sequence; the eviction order. Monotonic, unlike wall time.
    seq: u64,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<Fingerprint, Entry>,
    next_seq: u64,
}

pub struct ArtifactCache {
    limits: CacheLimits,
    disk_dir: Option<PathBuf>,
    inner: Mutex<CacheInner>,
}

impl ArtifactCache {
    pub fn new(limits: CacheLimits) -> Self {
        Self {
            limits,
            disk_dir: None,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Persist artifacts under `dir` so they survive restarts. Fingerprint
    /// collisions imply identical content, so overwrite-per-file needs no
    /// cross-process locking.
    pub fn with_disk_dir(mut self, dir: PathBuf) -> Self {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!("Could not create artifact dir {:?}: {}", dir, e);
        } else {
            self.disk_dir = Some(dir);
        }
        self
    }

    /// Return the artifact for this session's current fingerprint, rendering
    /// it via `renderer` on a miss. A render failure is returned typed and
    /// never cached; the next call retries.
    pub fn get_or_render(
        &self,
        session: &Session,
        display_name: &str,
        renderer: &dyn Renderer,
    ) -> Result<Artifact, RenderError> {
        let fingerprint = Fingerprint::of(session, display_name);

        if let Some(artifact) = self.lookup(&fingerprint) {
            return Ok(artifact);
        }
        if let Some(bytes) = self.load_from_disk(&fingerprint) {
            return Ok(self.insert(fingerprint, bytes));
        }

        // Render outside the lock; a concurrent request for the same
        // fingerprint may render too, producing identical bytes.
        let bytes = renderer.render(session, display_name)?;
        self.store_to_disk(&fingerprint, &bytes);
        Ok(self.insert(fingerprint, bytes))
    }

    /// Remove every entry belonging to one session. Fingerprints embed the
    /// session id, so this is a tag match, not a full-cache wipe.
    pub fn purge(&self, id: &SessionId) -> usize {
        let removed: Vec<Fingerprint> = {
            let mut inner = self.lock();
            let victims: Vec<Fingerprint> = inner
                .entries
                .keys()
                .filter(|fp| fp.session_id() == id)
                .cloned()
                .collect();
            for fp in &victims {
                inner.entries.remove(fp);
            }
            victims
        };

        for fp in &removed {
            self.remove_from_disk(fp);
        }
        removed.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().entries.contains_key(fingerprint)
    }

    fn lookup(&self, fingerprint: &Fingerprint) -> Option<Artifact> {
        let inner = self.lock();
        let entry = inner.entries.get(fingerprint)?;
        Some(Artifact {
            fingerprint: fingerprint.clone(),
            bytes: Arc::clone(&entry.bytes),
            created_at: entry.created_at,
        })
    }

    fn insert(&self, fingerprint: Fingerprint, bytes: Vec<u8>) -> Artifact {
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let entry = Entry {
            bytes: Arc::from(bytes),
            seq,
            created_at: Utc::now(),
        };
        let artifact = Artifact {
            fingerprint: fingerprint.clone(),
            bytes: Arc::clone(&entry.bytes),
            created_at: entry.created_at,
        };
        inner.entries.insert(fingerprint, entry);

        if inner.entries.len() > self.limits.max_entries {
            let mut by_age: Vec<(Fingerprint, u64)> = inner
                .entries
                .iter()
                .map(|(fp, e)| (fp.clone(), e.seq))
                .collect();
            by_age.sort_by_key(|&(_, seq)| seq);

            let evicted: Vec<Fingerprint> = by_age
                .into_iter()
                .take(self.limits.evict_chunk)
                .map(|(fp, _)| fp)
                .collect();
            for fp in &evicted {
                inner.entries.remove(fp);
            }
            tracing::debug!(
                "Evicted {} oldest artifacts ({} remain)",
                evicted.len(),
                inner.entries.len()
            );
        }

        artifact
    }

    fn disk_path(&self, fingerprint: &Fingerprint) -> Option<PathBuf> {
        self.disk_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.svg", fingerprint)))
    }

    fn load_from_disk(&self, fingerprint: &Fingerprint) -> Option<Vec<u8>> {
        let path = self.disk_path(fingerprint)?;
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Discarding unreadable artifact {:?}: {}", path, e);
                let _ = std::fs::remove_file(&path);
                return None;
            }
        };

        // Corrupt entries are discarded and treated as a miss, forcing a
        // re-render.
        if !bytes.starts_with(b"<svg") {
            tracing::warn!("Discarding corrupt artifact {:?}", path);
            let _ = std::fs::remove_file(&path);
            return None;
        }
        Some(bytes)
    }

    fn store_to_disk(&self, fingerprint: &Fingerprint, bytes: &[u8]) {
        let Some(path) = self.disk_path(fingerprint) else {
            return;
        };
        if let Err(e) = std::fs::write(&path, bytes) {
            tracing::warn!("Could not persist artifact {:?}: {}", path, e);
        }
    }

    fn remove_from_disk(&self, fingerprint: &Fingerprint) {
        if let Some(path) = self.disk_path(fingerprint) {
            let _ = std::fs::remove_file(path);
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
