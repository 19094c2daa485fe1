//! Bucketed best-of aggregation across sessions.
//!
//! Sessions are grouped by their peak BPM rounded to the nearest multiple of
//! [`BUCKET_WIDTH`]; per bucket we keep the session count and the best
//! (minimum) UR at each tracked window size. Always recomputed from the full
//! session set so deletions need no invalidation logic.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::Session;

/// Window sizes the dashboard tracks best-UR for.
pub const TRACKED_WINDOWS: [u32; 4] = [20, 60, 100, 200];

/// Bucket width in BPM.
pub const BUCKET_WIDTH: f64 = 10.0;

/// Best UR observed in a bucket for one tracked window size. `None` when no
/// contributing session reports that window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowBest {
    pub window: u32,
    pub ur: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BpmBucket {
    /// Bucket key: peak BPM rounded to the nearest multiple of 10.
    pub bucket: i64,
    /// Number of sessions that fell into this bucket.
    pub count: usize,
    pub best_ur: Vec<WindowBest>,
}

/// Fold the given sessions into buckets, ascending by bucket key.
///
/// A session contributes only if it has a peak BPM; sessions without best
/// rows are excluded entirely rather than placed in a default bucket.
pub fn aggregate<'a, I>(sessions: I) -> Vec<BpmBucket>
where
    I: IntoIterator<Item = &'a Session>,
{
    let mut buckets: BTreeMap<i64, BpmBucket> = BTreeMap::new();

    for session in sessions {
        let Some(peak) = session.peak_bpm() else {
            continue;
        };
        let key = bucket_key(peak);

        let bucket = buckets.entry(key).or_insert_with(|| BpmBucket {
            bucket: key,
            count: 0,
            best_ur: TRACKED_WINDOWS
                .iter()
                .map(|&window| WindowBest { window, ur: None })
                .collect(),
        });
        bucket.count += 1;

        for best in bucket.best_ur.iter_mut() {
            if let Some(ur) = session.best_ur_at(best.window) {
                best.ur = Some(best.ur.map_or(ur, |cur| cur.min(ur)));
            }
        }
    }

    buckets.into_values().collect()
}

pub fn bucket_key(peak_bpm: f64) -> i64 {
    (peak_bpm / BUCKET_WIDTH).round() as i64 * BUCKET_WIDTH as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_key_nearest_multiple() {
        assert_eq!(bucket_key(183.0), 180);
        assert_eq!(bucket_key(176.0), 180);
        assert_eq!(bucket_key(174.9), 170);
        assert_eq!(bucket_key(185.0), 190); // .5 rounds away from zero
        assert_eq!(bucket_key(0.0), 0);
    }
}
