//! Chain sessions and the cancellation registry.
//!
//! A running chain is split in two halves:
//! - [`SessionHandle`]: the shared, registry-visible half (id, topic,
//!   cancellation token, coarse state)
//! - [`ChainSession`]: the orchestrator-owned half holding stage outputs
//!
//! A cancel request can only reach the handle, so it can never touch
//! stage outputs.

mod chain_session;
mod handle;
mod registry;

pub use chain_session::ChainSession;
pub use handle::{SessionHandle, SessionSummary};
pub use registry::CancellationRegistry;
