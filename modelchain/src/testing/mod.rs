//! Testing utilities for modelchain.
//!
//! This module provides:
//! - [`ScriptedBackend`], a deterministic stand-in for Ollama
//! - Event sinks for asserting on progress, re-exported from
//!   [`events`](crate::events)

mod backend;

pub use crate::events::CollectingEventSink;
pub use backend::{ScriptedBackend, ScriptedReply};
