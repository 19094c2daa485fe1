//! The authoritative versioned session store.
//!
//! Single-writer/multi-reader: the sync loop owns all mutations while any
//! number of request handlers snapshot concurrently. Sessions live behind
//! `Arc`, so a snapshot copies references only and a reader can never see a
//! half-written session. The version counter strictly increases on every
//! accepted mutation, giving readers monotonic visibility.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::types::{Session, SessionId};

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, Arc<Session>>,
    version: u64,
}

/// Point-in-time read-only view: the version at capture plus sessions
/// ordered by `last_modified` descending, truncated to the requested count.
#[derive(Clone)]
pub struct TableSnapshot {
    pub version: u64,
    pub captured_at: DateTime<Utc>,
    pub sessions: Vec<Arc<Session>>,
}

#[derive(Default)]
pub struct SessionTable {
    inner: RwLock<Inner>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a session and bump the version. Returns the new
    /// version.
    pub fn upsert(&self, session: Session) -> u64 {
        let mut inner = self.write();
        inner.sessions.insert(session.id.clone(), Arc::new(session));
        inner.version += 1;
        inner.version
    }

    /// Remove a session. Idempotent: deleting an absent id is a no-op and
    /// does not bump the version; `None` signals nothing was removed.
    pub fn delete(&self, id: &SessionId) -> Option<u64> {
        let mut inner = self.write();
        inner.sessions.remove(id)?;
        inner.version += 1;
        Some(inner.version)
    }

    /// Bump the version without changing session data. Used when display
    /// metadata stored outside the table (a rename) changes what readers
    /// should re-fetch.
    pub fn touch(&self, id: &SessionId) -> Option<u64> {
        let mut inner = self.write();
        if !inner.sessions.contains_key(id) {
            return None;
        }
        inner.version += 1;
        Some(inner.version)
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.read().sessions.get(id).cloned()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.read().sessions.contains_key(id)
    }

    pub fn version(&self) -> u64 {
        self.read().version
    }

    pub fn len(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().sessions.is_empty()
    }

    /// All live sessions, unordered. The aggregator recomputes from this on
    /// every request.
    pub fn all(&self) -> Vec<Arc<Session>> {
        self.read().sessions.values().cloned().collect()
    }

    /// Capture a snapshot: newest sessions first, at most `max` of them.
    /// Holds the read lock only long enough to clone the `Arc`s.
    pub fn snapshot(&self, max: usize) -> TableSnapshot {
        let (version, mut sessions) = {
            let inner = self.read();
            let sessions: Vec<Arc<Session>> = inner.sessions.values().cloned().collect();
            (inner.version, sessions)
        };

        sessions.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| b.id.cmp(&a.id))
        });
        sessions.truncate(max);

        TableSnapshot {
            version,
            captured_at: Utc::now(),
            sessions,
        }
    }

    // A poisoned lock only means a panic elsewhere mid-mutation; every
    // mutation here is a single map operation, so the state is still
    // consistent and we keep serving.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
