//! Channel-backed event sink for push transports.

use super::EventSink;
use crate::core::ChainEvent;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Delivery counters for a [`ChannelEventSink`].
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    delivered: AtomicU64,
    dropped: AtomicU64,
    last_drop_time: RwLock<Option<Instant>>,
}

impl DeliveryMetrics {
    fn record_delivery(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        *self.last_drop_time.write() = Some(Instant::now());
    }

    /// Returns the number of events handed to the receiver.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Returns the number of events dropped because the receiver was gone.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Returns when the last event was dropped.
    #[must_use]
    pub fn last_drop_time(&self) -> Option<Instant> {
        *self.last_drop_time.read()
    }

    /// Converts metrics to a dictionary.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "delivered": self.delivered(),
            "dropped": self.dropped(),
        })
    }
}

/// Forwards events into an unbounded tokio channel.
///
/// Sending never waits, so a slow consumer cannot stall the chain, and the
/// channel preserves emission order. Once the receiver is dropped, events
/// are counted and discarded.
#[derive(Debug)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<ChainEvent>,
    metrics: DeliveryMetrics,
}

impl ChannelEventSink {
    /// Creates a sink and the receiver it feeds.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Wraps an existing sender.
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<ChainEvent>) -> Self {
        Self {
            tx,
            metrics: DeliveryMetrics::default(),
        }
    }

    /// Returns the delivery metrics.
    #[must_use]
    pub fn metrics(&self) -> &DeliveryMetrics {
        &self.metrics
    }

    /// Returns true once the receiver has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: ChainEvent) {
        let name = event.name();
        match self.tx.send(event) {
            Ok(()) => {
                self.metrics.record_delivery();
                debug!(event_type = name, "Event queued");
            }
            Err(_) => {
                self.metrics.record_drop();
                warn!(
                    event_type = name,
                    dropped_total = self.metrics.dropped(),
                    "Event dropped: receiver closed"
                );
            }
        }
    }
}
