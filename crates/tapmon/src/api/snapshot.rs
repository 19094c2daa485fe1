use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tapmon_render::RenderError;
use tapmon_sessions::Session;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct SnapshotParams {
    /// Table version the client already has. When it matches the current
    /// version, the handler answers 304 and skips rendering entirely.
    pub since: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub session_count: usize,
    pub sessions: Vec<SessionView>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: String,
    pub display_name: String,
    /// Max mtime across the session's files; the per-card creation time the
    /// dashboard shows.
    pub captured_at: DateTime<Utc>,
    pub peak_bpm: Option<f64>,
    pub best_ur: Option<f64>,
    /// The rendered chart, or `null` when rendering failed or timed out.
    pub artifact_svg: Option<String>,
}

fn session_view(session: &Session, display_name: String, artifact_svg: Option<String>) -> SessionView {
    SessionView {
        id: session.id.to_string(),
        display_name,
        captured_at: DateTime::<Utc>::from(session.last_modified),
        peak_bpm: session.peak_bpm(),
        best_ur: session.best_ur_max_window(),
        artifact_svg,
    }
}

pub async fn get_snapshot(
    State(state): State<AppState>,
    Query(params): Query<SnapshotParams>,
) -> Result<Json<SnapshotResponse>, StatusCode> {
    if params.since == Some(state.table.version()) {
        return Err(StatusCode::NOT_MODIFIED);
    }

    let snapshot = state.table.snapshot(state.snapshot_max);

    let mut sessions = Vec::with_capacity(snapshot.sessions.len());
    for session in snapshot.sessions {
        let display_name = state.names.display_name_for(&session);

        let artifact_svg = match render_with_deadline(&state, Arc::clone(&session), &display_name)
            .await
        {
            Ok(svg) => Some(svg),
            Err(e) => {
                tracing::warn!("Chart for session {} unavailable: {}", session.id, e);
                None
            }
        };

        sessions.push(session_view(&session, display_name, artifact_svg));
    }

    Ok(Json(SnapshotResponse {
        version: snapshot.version,
        timestamp: snapshot.captured_at,
        session_count: sessions.len(),
        sessions,
    }))
}

/// Render (or fetch from cache) off the async runtime, bounded by the
/// configured deadline. A timeout abandons the blocking task; its result, if
/// it ever finishes, still lands in the cache for the next request.
async fn render_with_deadline(
    state: &AppState,
    session: Arc<Session>,
    display_name: &str,
) -> Result<String, RenderError> {
    let cache = Arc::clone(&state.cache);
    let renderer = Arc::clone(&state.renderer);
    let name = display_name.to_string();

    let task =
        tokio::task::spawn_blocking(move || cache.get_or_render(&session, &name, &*renderer));

    let artifact = match tokio::time::timeout(state.render_timeout, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join_err)) => return Err(RenderError::Failed(join_err.to_string())),
        Err(_) => return Err(RenderError::Timeout),
    };

    Ok(String::from_utf8_lossy(&artifact.bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tapmon_sessions::SessionId;

    #[test]
    fn test_session_view_carries_captured_at() {
        let session = Session {
            id: SessionId::parse("1700000000").unwrap(),
            best_path: None,
            history_path: None,
            last_modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            best: None,
            history: Vec::new(),
        };

        let view = session_view(&session, "morning runs".to_string(), None);
        assert_eq!(view.captured_at.timestamp(), 1_700_000_000);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["captured_at"], "2023-11-14T22:13:20Z");
        assert_eq!(json["display_name"], "morning runs");
        assert!(json["artifact_svg"].is_null());
    }
}
