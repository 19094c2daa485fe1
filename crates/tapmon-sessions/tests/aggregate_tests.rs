use std::time::SystemTime;

use tapmon_sessions::{
    aggregate, BestRecords, BestRow, Session, SessionId, TRACKED_WINDOWS,
};

fn best_row(window: u32, bpm: f64, ur: f64) -> BestRow {
    BestRow {
        window,
        bpm,
        ur,
        zx: 0.0,
    }
}

/// A session whose peak BPM is `peak` and which reports best-UR values for
/// the given (window, ur) pairs.
fn session(id: &str, peak: f64, urs: &[(u32, f64)]) -> Session {
    Session {
        id: SessionId::parse(id).unwrap(),
        best_path: None,
        history_path: None,
        last_modified: SystemTime::UNIX_EPOCH,
        best: Some(BestRecords {
            bpm: vec![best_row(20, peak, 0.0)],
            ur: urs.iter().map(|&(w, ur)| best_row(w, 0.0, ur)).collect(),
            zx: Vec::new(),
        }),
        history: Vec::new(),
    }
}

fn empty_session(id: &str) -> Session {
    Session {
        id: SessionId::parse(id).unwrap(),
        best_path: None,
        history_path: None,
        last_modified: SystemTime::UNIX_EPOCH,
        best: None,
        history: Vec::new(),
    }
}

#[test]
fn test_neighbouring_peaks_share_a_bucket() {
    let sessions = vec![
        session("1700000001", 183.0, &[(20, 95.0)]),
        session("1700000002", 176.0, &[(20, 88.0)]),
    ];
    let buckets = aggregate(&sessions);

    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].bucket, 180);
    assert_eq!(buckets[0].count, 2);
}

#[test]
fn test_sessions_without_peak_are_excluded() {
    let sessions = vec![
        session("1700000001", 150.0, &[(20, 90.0)]),
        empty_session("1700000002"),
    ];
    let buckets = aggregate(&sessions);

    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].count, 1);
}

#[test]
fn test_best_ur_is_minimum_per_window() {
    let sessions = vec![
        session("1700000001", 178.0, &[(20, 95.0), (100, 120.0)]),
        session("1700000002", 182.0, &[(20, 88.5)]),
    ];
    let buckets = aggregate(&sessions);

    assert_eq!(buckets.len(), 1);
    let bucket = &buckets[0];
    assert_eq!(bucket.best_ur.len(), TRACKED_WINDOWS.len());

    let at = |w: u32| {
        bucket
            .best_ur
            .iter()
            .find(|b| b.window == w)
            .unwrap()
            .ur
    };
    assert_eq!(at(20), Some(88.5));
    assert_eq!(at(100), Some(120.0));
    assert_eq!(at(60), None); // nobody reports this window
    assert_eq!(at(200), None);
}

#[test]
fn test_buckets_ordered_ascending() {
    let sessions = vec![
        session("1700000001", 221.0, &[(20, 80.0)]),
        session("1700000002", 140.0, &[(20, 99.0)]),
        session("1700000003", 183.0, &[(20, 91.0)]),
    ];
    let buckets = aggregate(&sessions);

    let keys: Vec<i64> = buckets.iter().map(|b| b.bucket).collect();
    assert_eq!(keys, vec![140, 180, 220]);
}

#[test]
fn test_aggregate_idempotent() {
    let sessions = vec![
        session("1700000001", 178.0, &[(20, 95.0)]),
        session("1700000002", 182.0, &[(20, 88.5), (60, 101.0)]),
    ];

    let first = aggregate(&sessions);
    let second = aggregate(&sessions);
    assert_eq!(first, second);
}

#[test]
fn test_aggregate_reflects_deletion() {
    let all = vec![
        session("1700000001", 178.0, &[(20, 88.5)]),
        session("1700000002", 182.0, &[(20, 95.0)]),
    ];
    let with_both = aggregate(&all);
    assert_eq!(with_both[0].count, 2);
    assert_eq!(with_both[0].best_ur[0].ur, Some(88.5));

    // Remove the session that held the best value: a full recompute must
    // let the bucket's best relax to the survivor.
    let remaining = &all[1..];
    let after = aggregate(remaining);
    assert_eq!(after[0].count, 1);
    assert_eq!(after[0].best_ur[0].ur, Some(95.0));
}

#[test]
fn test_aggregate_empty_input() {
    let sessions: Vec<Session> = Vec::new();
    let buckets = aggregate(&sessions);
    assert!(buckets.is_empty());
}
