//! Event sink trait and in-process implementations.

use crate::core::ChainEvent;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, Level};

/// Receives progress events from a running chain.
///
/// `emit` is called inline by the orchestrator, so implementations must not
/// block and must never fail: delivery problems are logged and swallowed.
pub trait EventSink: Send + Sync {
    /// Emits an event.
    fn emit(&self, event: ChainEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: ChainEvent) {
        (**self).emit(event);
    }
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: ChainEvent) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: ChainEvent) {
        let name = event.name();
        let stage = event.stage().map(|s| s.as_str()).unwrap_or_default();
        if self.level == Level::DEBUG {
            debug!(event_type = name, stage, event = ?event, "Event: {}", name);
        } else {
            info!(event_type = name, stage, "Event: {}", name);
        }
    }
}

/// Records every event; intended for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<ChainEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<ChainEvent> {
        self.events.read().clone()
    }

    /// Returns collected event names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events.read().iter().map(ChainEvent::name).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events with the given name.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<ChainEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.name() == name)
            .cloned()
            .collect()
    }

    /// Returns the last event, if any.
    #[must_use]
    pub fn last(&self) -> Option<ChainEvent> {
        self.events.read().last().cloned()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: ChainEvent) {
        self.events.write().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageRole;

    #[test]
    fn test_noop_sink() {
        NoOpEventSink.emit(ChainEvent::session_assigned("s"));
    }

    #[test]
    fn test_logging_sink() {
        LoggingEventSink::default().emit(ChainEvent::stage_start(StageRole::Ideas, "gemma:2b"));
        LoggingEventSink::debug().emit(ChainEvent::error("boom", None));
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(ChainEvent::session_assigned("s"));
        sink.emit(ChainEvent::stage_start(StageRole::Ideas, "gemma:2b"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.names(), vec!["sessionAssigned", "stageStart"]);
        assert_eq!(sink.events_named("stageStart").len(), 1);
        assert_eq!(sink.last().unwrap().stage(), Some(StageRole::Ideas));

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_arc_sink_forwards() {
        let inner = Arc::new(CollectingEventSink::new());
        let shared: Arc<dyn EventSink> = inner.clone();
        shared.emit(ChainEvent::session_assigned("s"));
        assert_eq!(inner.len(), 1);
    }
}
