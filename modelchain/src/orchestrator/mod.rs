//! Chain orchestration.
//!
//! [`ChainOrchestrator`] drives one topic through ideas, outline, draft and
//! final, then the optional quality check, emitting progress to an
//! [`EventSink`](crate::events::EventSink) as it goes.

mod engine;

pub use engine::ChainOrchestrator;

/// Quality assessment reported when the quality stage fails.
pub const QUALITY_UNAVAILABLE: &str = "quality check unavailable";
