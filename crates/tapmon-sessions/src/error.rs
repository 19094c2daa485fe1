use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// Transient filesystem failure. The sync loop backs off and retries;
    /// never fatal.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file exists but its contents don't match the expected shape.
    /// The offending session is skipped for the tick.
    #[error("malformed file {path:?}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// A mutation request carried an id that is not a valid session token.
    /// Rejected at the boundary before any storage access.
    #[error("invalid session id {0:?}: expected 10-15 decimal digits")]
    InvalidId(String),
}

impl SessionError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SessionError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
