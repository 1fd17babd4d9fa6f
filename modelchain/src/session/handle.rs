//! The shared half of a chain session.

use crate::cancellation::CancellationToken;
use crate::core::ChainState;
use crate::utils::iso_timestamp;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Registry-visible view of one in-flight chain.
#[derive(Debug)]
pub struct SessionHandle {
    id: String,
    topic: String,
    created_at: DateTime<Utc>,
    token: CancellationToken,
    state: RwLock<ChainState>,
}

impl SessionHandle {
    /// Creates a handle for a freshly accepted chain.
    #[must_use]
    pub fn new(id: impl Into<String>, topic: impl Into<String>) -> Self {
        let id = id.into();
        let token = CancellationToken::new();
        let log_id = id.clone();
        token.on_cancel(move || {
            info!(session_id = %log_id, "Chain cancellation requested");
        });

        Self {
            id,
            topic: topic.into(),
            created_at: Utc::now(),
            token,
            state: RwLock::new(ChainState::Idle),
        }
    }

    /// Returns the session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns when the session was accepted.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the session's cancellation token.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns the last state published by the orchestrator.
    #[must_use]
    pub fn state(&self) -> ChainState {
        *self.state.read()
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Requests cancellation; returns false if already cancelled.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        self.token.cancel(reason)
    }

    pub(crate) fn publish_state(&self, state: ChainState) {
        *self.state.write() = state;
    }

    /// Returns a serialisable snapshot of this session.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            topic: self.topic.clone(),
            state: self.state(),
            cancelled: self.is_cancelled(),
            created_at: iso_timestamp(self.created_at),
        }
    }
}

/// Snapshot of an active session, as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// The session id.
    pub session_id: String,
    /// The topic.
    pub topic: String,
    /// The current state.
    pub state: ChainState,
    /// Whether cancellation was requested.
    pub cancelled: bool,
    /// When the session was accepted (ISO 8601).
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageRole;

    #[test]
    fn test_new_handle_is_idle() {
        let handle = SessionHandle::new("s-1", "tides");
        assert_eq!(handle.id(), "s-1");
        assert_eq!(handle.topic(), "tides");
        assert_eq!(handle.state(), ChainState::Idle);
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_cancel_once() {
        let handle = SessionHandle::new("s-1", "tides");
        assert!(handle.cancel("client"));
        assert!(!handle.cancel("client again"));
        assert_eq!(handle.token().reason(), Some("client".to_string()));
    }

    #[test]
    fn test_summary_reflects_state() {
        let handle = SessionHandle::new("s-1", "tides");
        handle.publish_state(ChainState::Stage(StageRole::Outline));
        handle.cancel("client");

        let summary = handle.summary();
        assert_eq!(summary.session_id, "s-1");
        assert_eq!(summary.state, ChainState::Stage(StageRole::Outline));
        assert!(summary.cancelled);
    }
}
