//! Built-in SVG chart renderer.
//!
//! Produces the 2x2 session panel the dashboard embeds inline: history
//! moving averages, raw press intervals, and the best BPM/UR distributions
//! over window size. Output is plain SVG text and strictly deterministic for
//! identical input; pixel-perfect styling is not a goal.

use std::fmt::Write as _;

use tapmon_sessions::{BestRow, BpmBucket, HistoryRow, Session};

use crate::{RenderError, Renderer};

const BG: &str = "#2b2b2b";
const PANEL_BG: &str = "#363636";
const GRID: &str = "#555555";
const TEXT: &str = "#cccccc";
const TITLE: &str = "#ffaa44";
const BPM_COLOR: &str = "#ff69b4";
const UR_COLOR: &str = "#40e0d0";
const ZX_COLOR: &str = "#cc8800";
const INTERVAL_COLOR: &str = "#88ccff";

const WIDTH: f64 = 1280.0;
const HEIGHT: f64 = 800.0;
const MARGIN: f64 = 20.0;
const HEADER: f64 = 40.0;

#[derive(Default)]
pub struct SvgRenderer;

impl Renderer for SvgRenderer {
    fn render(&self, session: &Session, display_name: &str) -> Result<Vec<u8>, RenderError> {
        let mut svg = String::with_capacity(16 * 1024);
        svg_open(&mut svg, WIDTH, HEIGHT);
        write!(
            svg,
            "<text x='{:.1}' y='28' fill='{}' font-size='18' font-weight='bold' \
             text-anchor='middle' font-family='sans-serif'>{}</text>",
            WIDTH / 2.0,
            TEXT,
            escape(display_name)
        )
        .map_err(fmt_err)?;

        let panel_w = (WIDTH - 3.0 * MARGIN) / 2.0;
        let panel_h = (HEIGHT - HEADER - 3.0 * MARGIN) / 2.0;
        let col = |i: usize| MARGIN + i as f64 * (panel_w + MARGIN);
        let row = |i: usize| HEADER + MARGIN + i as f64 * (panel_h + MARGIN);

        history_panel(&mut svg, session, col(0), row(0), panel_w, panel_h).map_err(fmt_err)?;
        intervals_panel(&mut svg, session, col(1), row(0), panel_w, panel_h).map_err(fmt_err)?;
        best_panel(
            &mut svg,
            session.best.as_ref().map(|b| b.bpm.as_slice()),
            "BEST BPM",
            BPM_COLOR,
            |r| r.bpm,
            col(0),
            row(1),
            panel_w,
            panel_h,
        )
        .map_err(fmt_err)?;
        best_panel(
            &mut svg,
            session.best.as_ref().map(|b| b.ur.as_slice()),
            "BEST UR",
            UR_COLOR,
            |r| r.ur,
            col(1),
            row(1),
            panel_w,
            panel_h,
        )
        .map_err(fmt_err)?;

        svg.push_str("</svg>");
        Ok(svg.into_bytes())
    }
}

impl SvgRenderer {
    /// Bar chart of the BPM-bucket aggregation: session count per bucket
    /// with the best UR at the largest tracked window as a label.
    pub fn render_buckets(&self, buckets: &[BpmBucket]) -> Vec<u8> {
        let w = 900.0;
        let h = 360.0;
        let mut svg = String::with_capacity(4 * 1024);
        svg_open(&mut svg, w, h);

        if buckets.is_empty() {
            let _ = write!(
                svg,
                "<text x='{:.1}' y='{:.1}' fill='{}' font-size='14' text-anchor='middle' \
                 font-family='sans-serif'>no sessions to aggregate</text>",
                w / 2.0,
                h / 2.0,
                TEXT
            );
            svg.push_str("</svg>");
            return svg.into_bytes();
        }

        let max_count = buckets.iter().map(|b| b.count).max().unwrap_or(1) as f64;
        let slot = (w - 2.0 * MARGIN) / buckets.len() as f64;
        let bar_w = (slot * 0.6).min(80.0);
        let base = h - 40.0;
        let scale = (base - 50.0) / max_count;

        for (i, bucket) in buckets.iter().enumerate() {
            let x = MARGIN + i as f64 * slot + (slot - bar_w) / 2.0;
            let bar_h = bucket.count as f64 * scale;
            let _ = write!(
                svg,
                "<rect x='{:.1}' y='{:.1}' width='{:.1}' height='{:.1}' fill='{}' rx='2'/>",
                x,
                base - bar_h,
                bar_w,
                bar_h,
                BPM_COLOR
            );
            let _ = write!(
                svg,
                "<text x='{:.1}' y='{:.1}' fill='{}' font-size='12' text-anchor='middle' \
                 font-family='sans-serif'>{}</text>",
                x + bar_w / 2.0,
                base + 16.0,
                TEXT,
                bucket.bucket
            );
            let _ = write!(
                svg,
                "<text x='{:.1}' y='{:.1}' fill='{}' font-size='11' text-anchor='middle' \
                 font-family='sans-serif'>{}x</text>",
                x + bar_w / 2.0,
                base - bar_h - 20.0,
                TEXT,
                bucket.count
            );
            if let Some(ur) = bucket.best_ur.iter().rev().find_map(|b| b.ur) {
                let _ = write!(
                    svg,
                    "<text x='{:.1}' y='{:.1}' fill='{}' font-size='11' text-anchor='middle' \
                     font-family='sans-serif'>UR {:.1}</text>",
                    x + bar_w / 2.0,
                    base - bar_h - 6.0,
                    UR_COLOR,
                    ur
                );
            }
        }

        svg.push_str("</svg>");
        svg.into_bytes()
    }
}

fn svg_open(svg: &mut String, w: f64, h: f64) {
    let _ = write!(
        svg,
        "<svg xmlns='http://www.w3.org/2000/svg' width='{:.0}' height='{:.0}' \
         viewBox='0 0 {:.0} {:.0}'><rect width='100%' height='100%' fill='{}'/>",
        w, h, w, h, BG
    );
}

/// Moving-average history: BPM line with the UR line over it, each scaled to
/// its own range.
fn history_panel(
    svg: &mut String,
    session: &Session,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
) -> std::fmt::Result {
    panel_frame(svg, x, y, w, h, "STATS HISTORY")?;

    let rows: Vec<&HistoryRow> = session
        .history
        .iter()
        .filter(|r| r.bpm_avg.is_some() || r.ur_avg.is_some())
        .collect();
    if rows.is_empty() {
        return no_data(svg, x, y, w, h);
    }

    let presses: Vec<f64> = rows.iter().map(|r| r.press as f64).collect();
    let bpm: Vec<f64> = rows.iter().filter_map(|r| r.bpm_avg).collect();
    let ur: Vec<f64> = rows.iter().filter_map(|r| r.ur_avg).collect();

    let bpm_max = series_max(&bpm).max(280.0);
    if !bpm.is_empty() {
        let points: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|r| r.bpm_avg.map(|v| (r.press as f64, v)))
            .collect();
        polyline(svg, &points, x, y, w, h, x_range(&presses), (0.0, bpm_max), BPM_COLOR, 2.0)?;
    }
    if !ur.is_empty() {
        let points: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|r| r.ur_avg.map(|v| (r.press as f64, v)))
            .collect();
        polyline(svg, &points, x, y, w, h, x_range(&presses), (0.0, 300.0), UR_COLOR, 1.0)?;
    }
    legend(svg, x, y, &[("BPM avg", BPM_COLOR), ("UR avg", UR_COLOR)])
}

/// Raw intervals with the ZX balance line when present.
fn intervals_panel(
    svg: &mut String,
    session: &Session,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
) -> std::fmt::Result {
    panel_frame(svg, x, y, w, h, "RAW INTERVALS")?;

    if session.history.is_empty() {
        return no_data(svg, x, y, w, h);
    }

    let presses: Vec<f64> = session.history.iter().map(|r| r.press as f64).collect();
    let points: Vec<(f64, f64)> = session
        .history
        .iter()
        .map(|r| (r.press as f64, r.interval_ms))
        .collect();
    polyline(svg, &points, x, y, w, h, x_range(&presses), (0.0, 200.0), INTERVAL_COLOR, 1.5)?;

    let zx: Vec<(f64, f64)> = session
        .history
        .iter()
        .filter_map(|r| r.zx_avg.map(|v| (r.press as f64, v)))
        .collect();
    if !zx.is_empty() {
        let zx_abs = zx.iter().map(|&(_, v)| v.abs()).fold(20.0f64, f64::max);
        polyline(svg, &zx, x, y, w, h, x_range(&presses), (-zx_abs, zx_abs), ZX_COLOR, 1.5)?;
    }
    legend(svg, x, y, &[("interval ms", INTERVAL_COLOR), ("ZX %", ZX_COLOR)])
}

/// Best metric value over window size (used for both BPM and UR panels).
#[allow(clippy::too_many_arguments)]
fn best_panel(
    svg: &mut String,
    rows: Option<&[BestRow]>,
    title: &str,
    color: &str,
    value: fn(&BestRow) -> f64,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
) -> std::fmt::Result {
    panel_frame(svg, x, y, w, h, title)?;

    let rows = rows.unwrap_or(&[]);
    if rows.is_empty() {
        return no_data(svg, x, y, w, h);
    }

    let mut sorted: Vec<&BestRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.window);

    let windows: Vec<f64> = sorted.iter().map(|r| r.window as f64).collect();
    let points: Vec<(f64, f64)> = sorted
        .iter()
        .map(|r| (r.window as f64, value(r)))
        .collect();
    let y_max = series_max(&points.iter().map(|&(_, v)| v).collect::<Vec<_>>()).max(1.0) * 1.1;

    polyline(svg, &points, x, y, w, h, x_range(&windows), (0.0, y_max), color, 2.0)?;
    for &(px, py) in &points {
        let (cx, cy) = project(px, py, x, y, w, h, x_range(&windows), (0.0, y_max));
        write!(svg, "<circle cx='{:.1}' cy='{:.1}' r='3' fill='{}'/>", cx, cy, color)?;
    }
    Ok(())
}

fn panel_frame(
    svg: &mut String,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    title: &str,
) -> std::fmt::Result {
    write!(
        svg,
        "<rect x='{:.1}' y='{:.1}' width='{:.1}' height='{:.1}' fill='{}' stroke='{}' rx='6'/>",
        x, y, w, h, PANEL_BG, GRID
    )?;
    write!(
        svg,
        "<text x='{:.1}' y='{:.1}' fill='{}' font-size='13' font-weight='bold' \
         text-anchor='middle' font-family='sans-serif'>{}</text>",
        x + w / 2.0,
        y + 18.0,
        TITLE,
        title
    )
}

fn no_data(svg: &mut String, x: f64, y: f64, w: f64, h: f64) -> std::fmt::Result {
    write!(
        svg,
        "<text x='{:.1}' y='{:.1}' fill='{}' font-size='13' text-anchor='middle' \
         font-family='sans-serif'>no data</text>",
        x + w / 2.0,
        y + h / 2.0,
        TEXT
    )
}

fn legend(svg: &mut String, x: f64, y: f64, items: &[(&str, &str)]) -> std::fmt::Result {
    for (i, (label, color)) in items.iter().enumerate() {
        write!(
            svg,
            "<text x='{:.1}' y='{:.1}' fill='{}' font-size='11' font-family='sans-serif'>{}</text>",
            x + 12.0,
            y + 34.0 + i as f64 * 14.0,
            color,
            label
        )?;
    }
    Ok(())
}

/// Plot area inset inside the panel frame.
const INSET_TOP: f64 = 28.0;
const INSET: f64 = 12.0;

fn project(
    px: f64,
    py: f64,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    (x_min, x_max): (f64, f64),
    (y_min, y_max): (f64, f64),
) -> (f64, f64) {
    let plot_w = w - 2.0 * INSET;
    let plot_h = h - INSET_TOP - INSET;
    let fx = if x_max > x_min { (px - x_min) / (x_max - x_min) } else { 0.5 };
    let fy = if y_max > y_min { (py - y_min) / (y_max - y_min) } else { 0.5 };
    let fy = fy.clamp(0.0, 1.0);
    (x + INSET + fx * plot_w, y + INSET_TOP + (1.0 - fy) * plot_h)
}

#[allow(clippy::too_many_arguments)]
fn polyline(
    svg: &mut String,
    points: &[(f64, f64)],
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    x_range: (f64, f64),
    y_range: (f64, f64),
    color: &str,
    stroke: f64,
) -> std::fmt::Result {
    if points.is_empty() {
        return Ok(());
    }
    let mut attr = String::with_capacity(points.len() * 12);
    for &(px, py) in points {
        let (cx, cy) = project(px, py, x, y, w, h, x_range, y_range);
        let _ = write!(attr, "{:.1},{:.1} ", cx, cy);
    }
    write!(
        svg,
        "<polyline points='{}' fill='none' stroke='{}' stroke-width='{:.1}'/>",
        attr.trim_end(),
        color,
        stroke
    )
}

fn x_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min.is_finite() && max.is_finite() {
        (min, max)
    } else {
        (0.0, 1.0)
    }
}

fn series_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
}

fn fmt_err(e: std::fmt::Error) -> RenderError {
    RenderError::Failed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use tapmon_sessions::{BestRecords, SessionId};

    fn sample_session() -> Session {
        Session {
            id: SessionId::parse("1700000000").unwrap(),
            best_path: None,
            history_path: None,
            last_modified: SystemTime::UNIX_EPOCH,
            best: Some(BestRecords {
                bpm: vec![BestRow { window: 20, bpm: 183.0, ur: 95.0, zx: 1.0 }],
                ur: vec![BestRow { window: 20, bpm: 180.0, ur: 88.0, zx: 0.5 }],
                zx: Vec::new(),
            }),
            history: vec![
                HistoryRow { press: 1, interval_ms: 83.0, bpm_avg: None, ur_avg: None, zx_avg: None },
                HistoryRow { press: 8, interval_ms: 85.0, bpm_avg: Some(176.0), ur_avg: Some(92.0), zx_avg: Some(3.0) },
            ],
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = SvgRenderer;
        let session = sample_session();
        let a = renderer.render(&session, "run one").unwrap();
        let b = renderer.render(&session, "run one").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_produces_svg_with_title() {
        let renderer = SvgRenderer;
        let bytes = renderer.render(&sample_session(), "morning <runs>").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<svg"));
        assert!(text.ends_with("</svg>"));
        assert!(text.contains("morning &lt;runs&gt;"));
    }

    #[test]
    fn test_render_empty_session_still_renders() {
        let renderer = SvgRenderer;
        let session = Session {
            best: None,
            history: Vec::new(),
            ..sample_session()
        };
        let text = String::from_utf8(renderer.render(&session, "empty").unwrap()).unwrap();
        assert!(text.contains("no data"));
    }

    #[test]
    fn test_render_buckets_empty_and_filled() {
        let renderer = SvgRenderer;
        let empty = String::from_utf8(renderer.render_buckets(&[])).unwrap();
        assert!(empty.contains("no sessions"));

        let buckets = vec![tapmon_sessions::BpmBucket {
            bucket: 180,
            count: 3,
            best_ur: vec![tapmon_sessions::WindowBest { window: 20, ur: Some(88.5) }],
        }];
        let filled = String::from_utf8(renderer.render_buckets(&buckets)).unwrap();
        assert!(filled.contains("180"));
        assert!(filled.contains("UR 88.5"));
    }
}
