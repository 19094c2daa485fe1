use std::fmt;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};
use tapmon_sessions::{Session, SessionId};

/// Cache key for a rendered artifact: the session id plus a digest of its
/// change-relevant attributes (mtime, display name, row counts per subset).
///
/// This is a heuristic, not a byte hash: two files with identical row counts
/// and mtime collapse to the same fingerprint. The producer always rewrites
/// files with a fresh mtime, so that collision cannot happen in practice.
///
/// The session id is kept outside the digest so deletion can purge exactly
/// the entries belonging to one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    session_id: SessionId,
    digest: String,
}

impl Fingerprint {
    pub fn of(session: &Session, display_name: &str) -> Self {
        let mtime_ms = session
            .last_modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let mut hasher = Sha256::new();
        hasher.update(session.id.as_str().as_bytes());
        hasher.update(mtime_ms.to_le_bytes());
        hasher.update(display_name.as_bytes());
        for count in session.row_counts() {
            hasher.update((count as u64).to_le_bytes());
        }
        let digest = hex::encode(hasher.finalize());

        Self {
            session_id: session.id.clone(),
            digest: digest[..16].to_string(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.session_id, self.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn session(id: &str, offset_secs: u64) -> Session {
        Session {
            id: SessionId::parse(id).unwrap(),
            best_path: None,
            history_path: None,
            last_modified: SystemTime::UNIX_EPOCH + Duration::from_secs(offset_secs),
            best: None,
            history: Vec::new(),
        }
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let s = session("1700000000", 100);
        assert_eq!(Fingerprint::of(&s, "name"), Fingerprint::of(&s, "name"));
    }

    #[test]
    fn test_fingerprint_changes_with_mtime() {
        let a = session("1700000000", 100);
        let b = session("1700000000", 101);
        assert_ne!(Fingerprint::of(&a, "name"), Fingerprint::of(&b, "name"));
    }

    #[test]
    fn test_fingerprint_changes_with_display_name() {
        let s = session("1700000000", 100);
        assert_ne!(Fingerprint::of(&s, "a"), Fingerprint::of(&s, "b"));
    }

    #[test]
    fn test_fingerprint_embeds_session_id() {
        let s = session("1700000000", 100);
        let fp = Fingerprint::of(&s, "name");
        assert_eq!(fp.session_id().as_str(), "1700000000");
        assert!(fp.to_string().starts_with("1700000000-"));
    }
}
