mod aggregate;
mod live;
mod mutations;
mod snapshot;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use tapmon_render::{ArtifactCache, SvgRenderer};
use tapmon_sessions::{FilePattern, NameStore, SessionEvent, SessionTable};

use crate::web;

#[derive(Clone)]
pub struct AppState {
    pub table: Arc<SessionTable>,
    pub names: Arc<NameStore>,
    pub cache: Arc<ArtifactCache>,
    pub renderer: Arc<SvgRenderer>,
    pub events: tokio::sync::broadcast::Sender<SessionEvent>,
    pub samples_dir: PathBuf,
    pub best_pattern: FilePattern,
    pub history_pattern: FilePattern,
    pub snapshot_max: usize,
    pub render_timeout: Duration,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(web::dashboard))
        .route("/api/snapshot", get(snapshot::get_snapshot))
        .route("/api/aggregate", get(aggregate::get_aggregate))
        .route("/api/sessions/{id}/rename", post(mutations::rename_session))
        .route("/api/sessions/{id}", delete(mutations::delete_session))
        .route("/api/live", get(live::session_events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
