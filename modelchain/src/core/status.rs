//! The chain execution state machine.

use super::StageRole;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution state of one chain run.
///
/// `Idle → Stage(ideas) → … → Stage(final) → [Stage(quality)] → Complete`,
/// with `Aborted` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum ChainState {
    /// Accepted but not yet running.
    #[default]
    Idle,
    /// Running the given stage.
    Stage(StageRole),
    /// All stages finished.
    Complete,
    /// Stopped by cancellation or an unrecoverable error.
    Aborted,
}

impl fmt::Display for ChainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Stage(role) => write!(f, "stage({role})"),
            Self::Complete => write!(f, "complete"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

impl ChainState {
    /// Returns true if the state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Aborted)
    }

    /// Returns the running stage, if any.
    #[must_use]
    pub fn stage(&self) -> Option<StageRole> {
        match self {
            Self::Stage(role) => Some(*role),
            _ => None,
        }
    }

    /// Returns true if moving to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (*self, next) {
            (Self::Idle, Self::Stage(StageRole::Ideas)) => true,
            (Self::Stage(current), Self::Stage(following)) => {
                following.position() == current.position() + 1
            }
            (Self::Stage(StageRole::Final | StageRole::Quality), Self::Complete) => true,
            (Self::Idle | Self::Stage(_), Self::Aborted) => true,
            _ => false,
        }
    }
}
