//! CSV record parser for the two producer file formats.
//!
//! A file-level error (unreadable, required header columns missing) fails the
//! whole session for the tick; a bad individual row is skipped with a warning
//! so one stray line doesn't hide an otherwise good run.

use std::path::Path;

use csv::StringRecord;

use crate::error::SessionError;
use crate::scanner::SessionFiles;
use crate::types::{BestRecords, BestRow, HistoryRow, Session};

/// Parse a best-values file (`Window Size, Type, BPM, UR, ZX`) into rows
/// split by metric type.
pub fn parse_best(path: &Path) -> Result<BestRecords, SessionError> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|e| SessionError::malformed(path, e.to_string()))?
        .clone();

    let window_idx = require_column(path, &headers, "Window Size")?;
    let type_idx = require_column(path, &headers, "Type")?;
    let bpm_idx = require_column(path, &headers, "BPM")?;
    let ur_idx = require_column(path, &headers, "UR")?;
    let zx_idx = require_column(path, &headers, "ZX")?;

    let mut records = BestRecords::default();
    for (line, row) in reader.records().enumerate() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping unreadable row {} in {:?}: {}", line + 2, path, e);
                continue;
            }
        };

        let parsed = (
            field_u32(&row, window_idx),
            field_f64(&row, bpm_idx),
            field_f64(&row, ur_idx),
            field_f64(&row, zx_idx),
        );
        let (Some(window), Some(bpm), Some(ur), Some(zx)) = parsed else {
            tracing::warn!("Skipping malformed row {} in {:?}", line + 2, path);
            continue;
        };

        let dest = match row.get(type_idx).map(str::trim) {
            Some("BPM") => &mut records.bpm,
            Some("UR") => &mut records.ur,
            Some("ZX") => &mut records.zx,
            other => {
                tracing::warn!(
                    "Skipping row {} in {:?}: unknown metric type {:?}",
                    line + 2,
                    path,
                    other
                );
                continue;
            }
        };
        dest.push(BestRow { window, bpm, ur, zx });
    }

    Ok(records)
}

/// Parse a per-press history file (`Press, Interval_ms, *_avg8` or the
/// legacy `*_avg4` set). Empty moving-average cells parse to `None`.
pub fn parse_history(path: &Path) -> Result<Vec<HistoryRow>, SessionError> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|e| SessionError::malformed(path, e.to_string()))?
        .clone();

    let press_idx = require_column(path, &headers, "Press")?;
    let interval_idx = require_column(path, &headers, "Interval_ms")?;

    // Current exports carry avg8 columns; older ones avg4. Either set works.
    let avg_cols = ["BPM_avg8", "UR_avg8", "ZX_avg8"]
        .map(|name| find_column(&headers, name));
    let avg_cols = if avg_cols.iter().all(Option::is_some) {
        avg_cols
    } else {
        ["BPM_avg4", "UR_avg4", "ZX_avg4"].map(|name| find_column(&headers, name))
    };
    let [bpm_idx, ur_idx, zx_idx] = avg_cols;

    let mut rows = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping unreadable row {} in {:?}: {}", line + 2, path, e);
                continue;
            }
        };

        let (Some(press), Some(interval_ms)) =
            (field_u32(&row, press_idx), field_f64(&row, interval_idx))
        else {
            tracing::warn!("Skipping malformed row {} in {:?}", line + 2, path);
            continue;
        };

        rows.push(HistoryRow {
            press,
            interval_ms,
            bpm_avg: bpm_idx.and_then(|i| field_f64(&row, i)),
            ur_avg: ur_idx.and_then(|i| field_f64(&row, i)),
            zx_avg: zx_idx.and_then(|i| field_f64(&row, i)),
        });
    }

    Ok(rows)
}

/// Assemble a [`Session`] from whichever of the two paths are present.
/// A session with only one of its files is valid and still loaded.
pub fn load_session(files: &SessionFiles) -> Result<Session, SessionError> {
    let best = match &files.best {
        Some(path) => Some(parse_best(path)?),
        None => None,
    };
    let history = match &files.history {
        Some(path) => parse_history(path)?,
        None => Vec::new(),
    };

    Ok(Session {
        id: files.id.clone(),
        best_path: files.best.clone(),
        history_path: files.history.clone(),
        last_modified: files.last_modified,
        best,
        history,
    })
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, SessionError> {
    csv::Reader::from_path(path).map_err(|e| match e.into_kind() {
        csv::ErrorKind::Io(io) => SessionError::Io(io),
        kind => SessionError::malformed(path, format!("{:?}", kind)),
    })
}

fn require_column(
    path: &Path,
    headers: &StringRecord,
    name: &str,
) -> Result<usize, SessionError> {
    find_column(headers, name)
        .ok_or_else(|| SessionError::malformed(path, format!("missing column {:?}", name)))
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn field_f64(row: &StringRecord, idx: usize) -> Option<f64> {
    let value = row.get(idx)?.trim();
    if value.is_empty() {
        return None;
    }
    value.parse().ok()
}

fn field_u32(row: &StringRecord, idx: usize) -> Option<u32> {
    row.get(idx)?.trim().parse().ok()
}
