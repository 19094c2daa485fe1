//! # tapmon-sessions
//!
//! Core engine for the tapmon CSV monitor: discovers paired sample files
//! dropped by the tapping trainer, parses them into typed sessions, and keeps
//! an authoritative versioned in-memory table that many readers can snapshot
//! while a single background writer keeps it in sync with the directory.
//!
//! ## Key Types
//!
//! - [`SessionTable`] - Versioned single-writer/multi-reader session store
//! - [`SyncWorker`] - Background poll loop driving scan/parse/upsert
//! - [`Session`] - One exported trainer run (up to two CSV files)
//! - [`NameStore`] - Persisted display-name overrides

mod aggregate;
mod error;
mod names;
mod parser;
mod scanner;
mod sync;
mod table;
mod types;

pub use aggregate::{aggregate, BpmBucket, WindowBest, BUCKET_WIDTH, TRACKED_WINDOWS};
pub use error::SessionError;
pub use names::NameStore;
pub use parser::{load_session, parse_best, parse_history};
pub use scanner::{is_stale, scan_sessions, FilePattern, SessionFiles};
pub use sync::{SessionEvent, SyncConfig, SyncOutcome, SyncWorker};
pub use table::{SessionTable, TableSnapshot};
pub use types::{BestRecords, BestRow, HistoryRow, Session, SessionId};
