//! Downstream event delivery.
//!
//! The host application provides an [`EventSink`]; the pipeline calls it
//! fire-and-forget and never waits on the consumer.

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::events::AnalysisEvent;

/// Event name for raw per-line pass-through of engine output.
pub const ENGINE_OUTPUT_EVENT: &str = "stockfish-output";

/// Event name for the aggregated analysis stream.
pub const ANALYZED_OUTPUT_EVENT: &str = "stockfish-analyzed-output";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Line(String),
    Analysis(AnalysisEvent),
}

/// A named event together with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedEvent {
    #[serde(rename = "event")]
    pub name: &'static str,
    pub payload: EventPayload,
}

impl EmittedEvent {
    pub fn analysis(&self) -> Option<&AnalysisEvent> {
        match &self.payload {
            EventPayload::Analysis(event) => Some(event),
            EventPayload::Line(_) => None,
        }
    }
}

pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, name: &'static str, payload: EventPayload);
}

impl EventSink for mpsc::UnboundedSender<EmittedEvent> {
    fn emit(&self, name: &'static str, payload: EventPayload) {
        if self.send(EmittedEvent { name, payload }).is_err() {
            tracing::trace!("Event receiver dropped, discarding {}", name);
        }
    }
}

impl EventSink for broadcast::Sender<EmittedEvent> {
    fn emit(&self, name: &'static str, payload: EventPayload) {
        // No subscribers is not an error.
        let _ = self.send(EmittedEvent { name, payload });
    }
}
