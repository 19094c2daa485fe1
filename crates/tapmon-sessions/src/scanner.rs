//! Directory scanner and file pairer.
//!
//! The producer drops `best_bpm_ur_<id>.csv` and `stats_history_<id>.csv`
//! into the watched directory. Files whose numeric tokens are textually
//! identical belong to the same session; a session with only one of its two
//! files is still valid.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::SessionError;
use crate::types::SessionId;

/// A filename shape with one numeric token between a fixed prefix and
/// suffix, e.g. `best_bpm_ur_` + token + `.csv`.
#[derive(Debug, Clone)]
pub struct FilePattern {
    prefix: String,
    suffix: String,
}

impl FilePattern {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Extract the numeric token from a file name, or `None` when the name
    /// doesn't match the pattern (wrong affixes, empty or non-digit token).
    pub fn token<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let token = file_name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        (!token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())).then_some(token)
    }

    /// Reconstruct the exact file name for a validated session id. Used for
    /// targeted deletion so only producer-shaped names are ever touched.
    pub fn file_name(&self, id: &SessionId) -> String {
        format!("{}{}{}", self.prefix, id, self.suffix)
    }
}

/// The on-disk half of a session: paths found for each pattern plus the max
/// mtime across them, before any parsing happens.
#[derive(Debug, Clone)]
pub struct SessionFiles {
    pub id: SessionId,
    pub best: Option<PathBuf>,
    pub history: Option<PathBuf>,
    pub last_modified: SystemTime,
}

/// List the watched directory and group matching files into sessions.
///
/// An unreadable directory is an error (the caller backs off for the tick);
/// a file that vanishes between listing and stat is silently skipped, and a
/// name whose token is not a valid session id is ignored.
pub fn scan_sessions(
    dir: &Path,
    best_pattern: &FilePattern,
    history_pattern: &FilePattern,
) -> Result<Vec<SessionFiles>, SessionError> {
    let mut found: HashMap<SessionId, SessionFiles> = HashMap::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("Skipping unreadable dir entry in {:?}: {}", dir, e);
                continue;
            }
        };
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let (token, is_best) = if let Some(t) = best_pattern.token(name) {
            (t, true)
        } else if let Some(t) = history_pattern.token(name) {
            (t, false)
        } else {
            continue;
        };

        let Ok(id) = SessionId::parse(token) else {
            tracing::debug!("Ignoring {:?}: token is not a valid session id", name);
            continue;
        };

        // Vanished mid-scan; the next tick picks it up if it comes back.
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            tracing::debug!("Skipping {:?}: could not stat", path);
            continue;
        };

        let files = found.entry(id.clone()).or_insert_with(|| SessionFiles {
            id,
            best: None,
            history: None,
            last_modified: modified,
        });
        if is_best {
            files.best = Some(path);
        } else {
            files.history = Some(path);
        }
        files.last_modified = files.last_modified.max(modified);
    }

    Ok(found.into_values().collect())
}

/// Whether a session needs reloading: true iff it was never seen or its
/// current max mtime strictly exceeds the recorded one. This gate is what
/// keeps the poll loop from re-parsing and re-rendering unchanged sessions.
pub fn is_stale(previous: Option<SystemTime>, current: SystemTime) -> bool {
    match previous {
        None => true,
        Some(prev) => current > prev,
    }
}
