//! The orchestrator-owned half of a chain session.

use super::SessionHandle;
use crate::cancellation::CancellationToken;
use crate::core::{ChainState, StageResult};
use crate::errors::ChainError;
use crate::utils::generate_session_id;
use std::sync::Arc;

/// Live tracking record for one chain run.
///
/// Owned exclusively by the task executing the chain. Stage outputs are
/// stored here and never in the shared [`SessionHandle`].
#[derive(Debug)]
pub struct ChainSession {
    handle: Arc<SessionHandle>,
    state: ChainState,
    outputs: Vec<StageResult>,
}

impl ChainSession {
    /// Creates a session with a fresh id for a validated topic.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self::with_handle(Arc::new(SessionHandle::new(generate_session_id(), topic)))
    }

    /// Creates a session around an existing handle.
    #[must_use]
    pub fn with_handle(handle: Arc<SessionHandle>) -> Self {
        Self {
            handle,
            state: ChainState::Idle,
            outputs: Vec::new(),
        }
    }

    /// Returns the session id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.handle.id()
    }

    /// Returns the topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        self.handle.topic()
    }

    /// Returns the shared handle.
    #[must_use]
    pub fn handle(&self) -> &Arc<SessionHandle> {
        &self.handle
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        self.handle.token()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Returns the index of the next stage to record.
    #[must_use]
    pub fn current_stage_index(&self) -> usize {
        self.outputs.len()
    }

    /// Returns the recorded stage outputs in order.
    #[must_use]
    pub fn outputs(&self) -> &[StageResult] {
        &self.outputs
    }

    /// Returns the cleaned text of the most recent stage.
    #[must_use]
    pub fn last_output(&self) -> Option<&str> {
        self.outputs.last().map(|result| result.cleaned_text.as_str())
    }

    /// Fails with [`ChainError::Cancelled`] once cancellation was requested.
    pub(crate) fn ensure_active(&self) -> Result<(), ChainError> {
        if self.handle.is_cancelled() {
            Err(ChainError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Moves to `next`, rejecting transitions the state machine forbids.
    pub(crate) fn transition(&mut self, next: ChainState) -> Result<(), ChainError> {
        if !self.state.can_transition_to(next) {
            return Err(ChainError::Internal(format!(
                "illegal transition {} -> {next}",
                self.state
            )));
        }
        self.state = next;
        self.handle.publish_state(next);
        Ok(())
    }

    /// Forces the terminal `Aborted` state unless already terminal.
    pub(crate) fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.state = ChainState::Aborted;
            self.handle.publish_state(ChainState::Aborted);
        }
    }

    pub(crate) fn record(&mut self, result: StageResult) {
        self.outputs.push(result);
    }

    pub(crate) fn take_outputs(&mut self) -> Vec<StageResult> {
        std::mem::take(&mut self.outputs)
    }
}
