//! Event sinks for chain progress.
//!
//! The orchestrator only knows the [`EventSink`] trait; transports such as
//! server-sent events sit behind [`ChannelEventSink`].

mod channel;
mod sink;

pub use channel::{ChannelEventSink, DeliveryMetrics};
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
