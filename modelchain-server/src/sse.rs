//! Server-sent-event encoding of chain progress.

use axum::response::sse::Event;
use futures::stream::{self, Stream};
use modelchain::cancellation::CleanupGuard;
use modelchain::core::ChainEvent;
use modelchain::session::SessionHandle;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error};

/// Encodes a chain event; the SSE event name is the event `type`.
pub fn to_sse_event(event: &ChainEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(data) => Event::default().event(event.name()).data(data),
        Err(e) => {
            error!(error = %e, event_type = event.name(), "Failed to encode event");
            Event::default()
                .event("error")
                .data(r#"{"type":"error","message":"failed to encode event"}"#)
        }
    }
}

/// Turns a session's event receiver into an SSE body.
///
/// If the stream is dropped before a terminal event went out, the client
/// has gone away and the session is cancelled.
pub fn event_stream(
    rx: UnboundedReceiver<ChainEvent>,
    handle: Arc<SessionHandle>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let guard = CleanupGuard::new(move || {
        if handle.cancel("client disconnected") {
            debug!(session_id = %handle.id(), "SSE client went away, chain cancelled");
        }
    });

    stream::unfold((rx, guard), |(mut rx, mut guard)| async move {
        let event = rx.recv().await?;
        if event.is_terminal() {
            guard.disarm();
        }
        Some((Ok(to_sse_event(&event)), (rx, guard)))
    })
}
