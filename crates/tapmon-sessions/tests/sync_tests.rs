use std::fs::{self, File};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tapmon_sessions::{SessionEvent, SessionId, SessionTable, SyncConfig, SyncWorker};
use tempfile::TempDir;
use tokio::sync::broadcast;

const BEST_CSV: &str = "\
Window Size,Type,BPM,UR,ZX
20,BPM,183.000,95.500,1.200
20,UR,180.000,88.000,0.500
";

fn write_best(dir: &TempDir, id: &str) -> std::path::PathBuf {
    let path = dir.path().join(format!("best_bpm_ur_{}.csv", id));
    fs::write(&path, BEST_CSV).unwrap();
    path
}

fn worker(dir: &TempDir) -> (SyncWorker, Arc<SessionTable>, broadcast::Receiver<SessionEvent>) {
    let table = Arc::new(SessionTable::new());
    let (tx, rx) = broadcast::channel(64);
    let worker = SyncWorker::new(
        SyncConfig::new(dir.path().to_path_buf()),
        Arc::clone(&table),
        tx,
    );
    (worker, table, rx)
}

#[test]
fn test_tick_discovers_new_sessions() {
    let dir = TempDir::new().unwrap();
    write_best(&dir, "1700000001");
    write_best(&dir, "1700000002");

    let (mut worker, table, mut rx) = worker(&dir);
    let outcome = worker.run_once().unwrap();

    assert_eq!(outcome.scanned, 2);
    assert_eq!(outcome.reloaded, 2);
    assert_eq!(table.len(), 2);

    let mut discovered = 0;
    while let Ok(event) = rx.try_recv() {
        assert!(matches!(event, SessionEvent::SessionDiscovered { .. }));
        discovered += 1;
    }
    assert_eq!(discovered, 2);
}

#[test]
fn test_tick_skips_unchanged_sessions() {
    let dir = TempDir::new().unwrap();
    write_best(&dir, "1700000001");

    let (mut worker, table, _rx) = worker(&dir);
    assert_eq!(worker.run_once().unwrap().reloaded, 1);
    let version = table.version();

    // Nothing changed on disk: the second tick must not touch the table.
    let outcome = worker.run_once().unwrap();
    assert_eq!(outcome.scanned, 1);
    assert_eq!(outcome.reloaded, 0);
    assert_eq!(table.version(), version);
}

#[test]
fn test_tick_reloads_on_mtime_bump() {
    let dir = TempDir::new().unwrap();
    let path = write_best(&dir, "1700000001");

    let (mut worker, table, mut rx) = worker(&dir);
    worker.run_once().unwrap();
    while rx.try_recv().is_ok() {}
    let version = table.version();

    // Simulate the producer rewriting the file.
    let file = File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(5))
        .unwrap();
    drop(file);

    let outcome = worker.run_once().unwrap();
    assert_eq!(outcome.reloaded, 1);
    assert!(table.version() > version);
    assert!(matches!(
        rx.try_recv().unwrap(),
        SessionEvent::SessionUpdated { .. }
    ));
}

#[test]
fn test_tick_prunes_deleted_sessions() {
    let dir = TempDir::new().unwrap();
    let path = write_best(&dir, "1700000001");

    let purged = Arc::new(AtomicUsize::new(0));
    let table = Arc::new(SessionTable::new());
    let (tx, mut rx) = broadcast::channel(64);
    let mut worker = SyncWorker::new(
        SyncConfig::new(dir.path().to_path_buf()),
        Arc::clone(&table),
        tx,
    )
    .with_purge_hook({
        let purged = Arc::clone(&purged);
        Box::new(move |_id: &SessionId| {
            purged.fetch_add(1, Ordering::SeqCst);
        })
    });

    worker.run_once().unwrap();
    assert_eq!(table.len(), 1);
    while rx.try_recv().is_ok() {}

    fs::remove_file(&path).unwrap();
    let outcome = worker.run_once().unwrap();

    assert_eq!(outcome.removed, 1);
    assert!(table.is_empty());
    assert_eq!(purged.load(Ordering::SeqCst), 1);
    assert!(matches!(
        rx.try_recv().unwrap(),
        SessionEvent::SessionRemoved { .. }
    ));
}

#[test]
fn test_tick_skips_malformed_file_without_aborting() {
    let dir = TempDir::new().unwrap();
    write_best(&dir, "1700000001");
    // Best file with a missing required column fails the whole session.
    fs::write(
        dir.path().join("best_bpm_ur_1700000002.csv"),
        "Window Size,BPM\n20,180\n",
    )
    .unwrap();

    let (mut worker, table, _rx) = worker(&dir);
    let outcome = worker.run_once().unwrap();

    assert_eq!(outcome.scanned, 2);
    assert_eq!(outcome.reloaded, 1);
    assert_eq!(table.len(), 1);
    assert!(table.contains(&SessionId::parse("1700000001").unwrap()));

    // The malformed file is not retried until its mtime moves.
    assert_eq!(worker.run_once().unwrap().reloaded, 0);
}

#[test]
fn test_tick_missing_dir_errors_but_recovers() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("not_yet");

    let table = Arc::new(SessionTable::new());
    let (tx, _rx) = broadcast::channel(64);
    let mut worker = SyncWorker::new(SyncConfig::new(missing.clone()), Arc::clone(&table), tx);

    assert!(worker.run_once().is_err());

    fs::create_dir(&missing).unwrap();
    fs::write(missing.join("best_bpm_ur_1700000001.csv"), BEST_CSV).unwrap();
    let outcome = worker.run_once().unwrap();
    assert_eq!(outcome.reloaded, 1);
}
