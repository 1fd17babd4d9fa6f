//! Cooperative cancellation utilities.
//!
//! This module provides:
//! - CancellationToken for cooperative cancellation of an in-flight chain
//! - CleanupGuard for work that must run however a scope is left

mod guard;
mod token;

pub use guard::CleanupGuard;
pub use token::{CancelCallback, CancellationToken};
