//! Core domain model types for modelchain.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Stage roles and static stage definitions
//! - The chain state machine
//! - Progress events and stage/chain results

mod event;
mod result;
mod stage;
mod status;

pub use event::{ChainEvent, StageSummary};
pub use result::{ChainResult, StageResult};
pub use stage::{GenerationParams, StageDefinition, StageRole};
pub use status::ChainState;
