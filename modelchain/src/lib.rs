//! # Modelchain
//!
//! A sequential multi-model article chain over a local Ollama runtime.
//!
//! A topic flows through four dependent model calls, each fed the cleaned
//! output of the one before, with an optional critique at the end:
//!
//! - **Ideas** brainstorms angles (`gemma:2b` by default)
//! - **Outline** structures one of them (`mistral:latest`)
//! - **Draft** writes prose from the outline (`zephyr-7b:latest`)
//! - **Final** produces the article within a hard word budget (`llama3:latest`)
//! - **Quality** critiques the article, best effort
//!
//! Progress is reported as [`ChainEvent`](core::ChainEvent)s through an
//! [`EventSink`](events::EventSink), and a running chain can be cancelled by
//! its session id through the [`CancellationRegistry`](session::CancellationRegistry).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modelchain::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), ChainError> {
//! let config = ChainConfig::default();
//! let backend = Arc::new(OllamaClient::new(&config.backend)?);
//! let registry = Arc::new(CancellationRegistry::new());
//! let orchestrator = ChainOrchestrator::new(&config, backend, registry)?;
//!
//! let result = orchestrator
//!     .run("renewable energy policy", &LoggingEventSink::info())
//!     .await?;
//! println!("{}", result.final_text);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod backend;
pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod invoker;
pub mod observability;
pub mod orchestrator;
pub mod postprocess;
pub mod session;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{InferenceBackend, OllamaClient};
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{ChainConfig, ChainPlan};
    pub use crate::core::{
        ChainEvent, ChainResult, ChainState, GenerationParams, StageDefinition, StageResult,
        StageRole,
    };
    pub use crate::errors::{BackendError, ChainError, ConfigError, InvokeError};
    pub use crate::events::{
        ChannelEventSink, CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::invoker::ModelInvoker;
    pub use crate::orchestrator::{ChainOrchestrator, QUALITY_UNAVAILABLE};
    pub use crate::postprocess::ResponsePostProcessor;
    pub use crate::session::{CancellationRegistry, ChainSession, SessionSummary};
    pub use crate::utils::{generate_session_id, iso_timestamp};
}
