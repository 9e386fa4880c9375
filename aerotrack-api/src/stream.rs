use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::stream::{Stream, StreamExt};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/events", get(events))
}

/// Lifecycle events as server-sent events. Slow subscribers skip what they
/// missed instead of blocking publishers.
async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.ops.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(envelope) => match Event::default().event(envelope.event.name()).json_data(&envelope) {
                Ok(event) => Some(Ok(event)),
                Err(e) => {
                    tracing::warn!("Dropping unserializable event: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Event subscriber lagged: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
