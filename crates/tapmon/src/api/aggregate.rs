use axum::extract::State;
use axum::response::Json;
use serde::Serialize;

use tapmon_sessions::{aggregate, BpmBucket};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct AggregateResponse {
    pub version: u64,
    pub buckets: Vec<BpmBucket>,
    pub chart_svg: String,
}

/// Recompute the cross-session BPM buckets from the live table. Always a
/// full recomputation; the table is small and this makes deletions free.
pub async fn get_aggregate(State(state): State<AppState>) -> Json<AggregateResponse> {
    let version = state.table.version();
    let sessions = state.table.all();
    let buckets = aggregate(sessions.iter().map(|s| s.as_ref()));
    let chart_svg = String::from_utf8_lossy(&state.renderer.render_buckets(&buckets)).into_owned();

    Json(AggregateResponse {
        version,
        buckets,
        chart_svg,
    })
}
