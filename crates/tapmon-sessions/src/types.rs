use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Identifier of one trainer run: the unix-seconds token the producer embeds
/// in both file names. Doubles as the creation-time ordinal.
///
/// Only 10-15 decimal digits are accepted; the id is later used to construct
/// filesystem paths, so anything else is rejected up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub const MIN_LEN: usize = 10;
    pub const MAX_LEN: usize = 15;

    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let ok = (Self::MIN_LEN..=Self::MAX_LEN).contains(&raw.len())
            && raw.bytes().all(|b| b.is_ascii_digit());
        if ok {
            Ok(SessionId(raw.to_string()))
        } else {
            Err(SessionError::InvalidId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id interpreted as a unix timestamp (the producer writes seconds).
    pub fn epoch_secs(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the best-values file: the best observed metric for a given
/// analysis window size. Which metric the row is "best of" is carried by the
/// `Type` CSV column and decides which [`BestRecords`] vector it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BestRow {
    pub window: u32,
    pub bpm: f64,
    pub ur: f64,
    pub zx: f64,
}

/// Best-values rows split by metric type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BestRecords {
    pub bpm: Vec<BestRow>,
    pub ur: Vec<BestRow>,
    pub zx: Vec<BestRow>,
}

/// One row of the per-press history file. The moving-average columns are
/// empty for the first presses of a run, hence `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryRow {
    pub press: u32,
    pub interval_ms: f64,
    pub bpm_avg: Option<f64>,
    pub ur_avg: Option<f64>,
    pub zx_avg: Option<f64>,
}

/// One producer run, backed by up to two source files.
///
/// `best` and `history` are a deterministic function of the file contents;
/// `last_modified` is the max mtime across the present paths and is the sole
/// staleness signal for reloads.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub best_path: Option<PathBuf>,
    pub history_path: Option<PathBuf>,
    pub last_modified: SystemTime,
    pub best: Option<BestRecords>,
    pub history: Vec<HistoryRow>,
}

impl Session {
    /// Representative metric for aggregation: the highest best-window BPM.
    /// `None` when the session has no best-BPM rows (such sessions are
    /// excluded from bucketing entirely).
    pub fn peak_bpm(&self) -> Option<f64> {
        self.best
            .as_ref()?
            .bpm
            .iter()
            .map(|r| r.bpm)
            .fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.max(v)))
            })
    }

    /// Best (minimum) UR reported for an exact window size.
    pub fn best_ur_at(&self, window: u32) -> Option<f64> {
        self.best
            .as_ref()?
            .ur
            .iter()
            .filter(|r| r.window == window)
            .map(|r| r.ur)
            .fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.min(v)))
            })
    }

    /// Best UR at the largest window the session reports. This is the
    /// headline per-session figure on the dashboard.
    pub fn best_ur_max_window(&self) -> Option<f64> {
        self.best
            .as_ref()?
            .ur
            .iter()
            .max_by_key(|r| r.window)
            .map(|r| r.ur)
    }

    /// Display name used when no override is stored: the run timestamp
    /// derived from the id.
    pub fn default_display_name(&self) -> String {
        self.id
            .epoch_secs()
            .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Row counts of each record subset, in a fixed order. Feeds the
    /// artifact fingerprint.
    pub fn row_counts(&self) -> [usize; 4] {
        match &self.best {
            Some(b) => [b.bpm.len(), b.ur.len(), b.zx.len(), self.history.len()],
            None => [0, 0, 0, self.history.len()],
        }
    }
}
