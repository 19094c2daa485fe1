//! Persisted display-name overrides.
//!
//! A flat JSON map from session id to user-assigned name, loaded once at
//! startup and rewritten on every rename. Persistence is best-effort: a
//! write failure is logged and the in-memory state is kept.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::types::{Session, SessionId};

pub struct NameStore {
    path: PathBuf,
    names: Mutex<HashMap<String, String>>,
}

impl NameStore {
    /// Load overrides from `path`. A missing file is an empty map; a corrupt
    /// one is logged and treated as empty rather than refusing to start.
    pub fn load(path: PathBuf) -> Self {
        let names = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, String>>(&content) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt name file {:?}: {}", path, e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!("Could not read name file {:?}: {}", path, e);
                HashMap::new()
            }
        };

        Self {
            path,
            names: Mutex::new(names),
        }
    }

    pub fn get(&self, id: &SessionId) -> Option<String> {
        self.lock().get(id.as_str()).cloned()
    }

    /// The name to show for a session: the stored override, or a timestamp
    /// derived from the id.
    pub fn display_name_for(&self, session: &Session) -> String {
        self.get(&session.id)
            .unwrap_or_else(|| session.default_display_name())
    }

    /// Store an override and rewrite the file.
    pub fn rename(&self, id: &SessionId, name: &str) {
        let snapshot = {
            let mut names = self.lock();
            names.insert(id.to_string(), name.to_string());
            names.clone()
        };
        self.save(&snapshot);
    }

    /// Drop the override for a deleted session.
    pub fn remove(&self, id: &SessionId) {
        let snapshot = {
            let mut names = self.lock();
            if names.remove(id.as_str()).is_none() {
                return;
            }
            names.clone()
        };
        self.save(&snapshot);
    }

    fn save(&self, names: &HashMap<String, String>) {
        let json = match serde_json::to_string_pretty(names) {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!("Could not serialize name file: {}", e);
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            tracing::warn!("Could not write name file {:?}: {}", self.path, e);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.names.lock().unwrap_or_else(|e| e.into_inner())
    }
}
