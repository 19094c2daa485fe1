use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use tapmon_sessions::SessionEvent;

use super::AppState;

/// Server-sent events mirroring the sync loop's broadcast channel. Lets the
/// dashboard react between polls; a lagging subscriber misses events and
/// catches up on the next snapshot.
pub async fn session_events(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).map(|result| {
        let event = match result {
            Ok(evt) => {
                let event_type = match &evt {
                    SessionEvent::SessionDiscovered { .. } => "session_discovered",
                    SessionEvent::SessionUpdated { .. } => "session_updated",
                    SessionEvent::SessionRemoved { .. } => "session_removed",
                };
                Event::default()
                    .event(event_type)
                    .data(serde_json::to_string(&evt).unwrap_or_default())
            }
            Err(_) => Event::default().comment("missed event"),
        };
        Ok(event)
    });

    Sse::new(stream)
}
