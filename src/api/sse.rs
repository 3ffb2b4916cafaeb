//! Server-Sent Events support

use crate::a2a::AgentEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

/// Stream the events of one turn; ends once the turn drops its publisher
pub fn sse_stream(
    events_rx: mpsc::UnboundedReceiver<AgentEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = UnboundedReceiverStream::new(events_rx).map(|event| Ok(agent_event_to_sse(&event)));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn agent_event_to_sse(event: &AgentEvent) -> Event {
    let event_type = match event {
        AgentEvent::Task(_) => "task",
        AgentEvent::StatusUpdate(_) => "status-update",
    };
    Event::default()
        .event(event_type)
        .json_data(event)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to encode SSE event");
            Event::default().event("error").data(e.to_string())
        })
}
