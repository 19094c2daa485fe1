use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use tapmon_sessions::{SessionEvent, SessionId};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Store a display-name override. Bumps the table version so polling
/// clients refresh, and the changed name flows into the artifact
/// fingerprint, so the chart title re-renders on the next snapshot.
pub async fn rename_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RenameRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id = parse_id(&id)?;

    let name = body.name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name must not be empty".into()));
    }

    if state.table.touch(&id).is_none() {
        return Err((StatusCode::NOT_FOUND, format!("No session {}", id)));
    }

    state.names.rename(&id, name);
    let _ = state
        .events
        .send(SessionEvent::SessionUpdated { id: id.clone() });

    tracing::info!("Renamed session {} to {:?}", id, name);
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a session's files from disk and drop it everywhere: table,
/// artifact cache, name overrides. File names are reconstructed from the
/// validated id, so only producer-shaped names are ever removed.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id = parse_id(&id)?;

    if !state.table.contains(&id) {
        return Err((StatusCode::NOT_FOUND, format!("No session {}", id)));
    }

    for pattern in [&state.best_pattern, &state.history_pattern] {
        let path = state.samples_dir.join(pattern.file_name(&id));
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Could not remove {}: {}", path.display(), e),
                ));
            }
        }
    }

    state.table.delete(&id);
    state.cache.purge(&id);
    state.names.remove(&id);
    let _ = state
        .events
        .send(SessionEvent::SessionRemoved { id: id.clone() });

    tracing::info!("Deleted session {}", id);
    Ok(StatusCode::NO_CONTENT)
}

fn parse_id(raw: &str) -> Result<SessionId, (StatusCode, String)> {
    SessionId::parse(raw).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}
