//! Progress events emitted while a chain runs.

use super::{ChainResult, StageResult, StageRole};
use serde::{Deserialize, Serialize};

/// A stage output as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    /// The stage.
    pub stage: StageRole,
    /// The model that served it.
    pub model: String,
    /// The cleaned output.
    pub output: String,
}

/// A progress notification for one chain run.
///
/// Events for a session are emitted in order: `sessionAssigned`, then a
/// `stageStart`/`stageComplete` pair per stage, then exactly one of
/// `complete` or `error`. A cancelled chain simply stops emitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChainEvent {
    /// The chain was accepted under this session id.
    SessionAssigned {
        /// The id to use for cancellation.
        session_id: String,
    },

    /// A stage is about to call its model.
    StageStart {
        /// The stage.
        stage: StageRole,
        /// The model serving it.
        model: String,
    },

    /// A stage finished and produced cleaned output.
    StageComplete {
        /// The stage.
        stage: StageRole,
        /// The model that served it.
        model: String,
        /// The cleaned output.
        output: String,
        /// Word count, reported for the final stage.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        word_count: Option<usize>,
        /// The assessment, reported for the quality stage.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quality_check: Option<String>,
    },

    /// Every stage finished.
    Complete {
        /// The session id.
        session_id: String,
        /// The final article.
        final_output: String,
        /// Mandatory stage outputs in execution order.
        stages: Vec<StageSummary>,
        /// The quality assessment, if enabled.
        quality_check: Option<String>,
        /// Word count of the final article.
        word_count: usize,
    },

    /// The chain was aborted by a failure.
    Error {
        /// Human-readable description.
        message: String,
        /// The failing stage, if the failure belongs to one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<StageRole>,
    },
}

impl ChainEvent {
    /// Creates a `sessionAssigned` event.
    #[must_use]
    pub fn session_assigned(session_id: impl Into<String>) -> Self {
        Self::SessionAssigned {
            session_id: session_id.into(),
        }
    }

    /// Creates a `stageStart` event.
    #[must_use]
    pub fn stage_start(stage: StageRole, model: impl Into<String>) -> Self {
        Self::StageStart {
            stage,
            model: model.into(),
        }
    }

    /// Creates a `stageComplete` event from a stage result.
    #[must_use]
    pub fn stage_complete(result: &StageResult) -> Self {
        let word_count = (result.stage == StageRole::Final).then(|| result.word_count());
        let quality_check = result
            .stage
            .is_quality()
            .then(|| result.cleaned_text.clone());

        Self::StageComplete {
            stage: result.stage,
            model: result.model.clone(),
            output: result.cleaned_text.clone(),
            word_count,
            quality_check,
        }
    }

    /// Creates a `complete` event from the chain result.
    #[must_use]
    pub fn complete(result: &ChainResult) -> Self {
        Self::Complete {
            session_id: result.session_id.clone(),
            final_output: result.final_text.clone(),
            stages: result.summaries(),
            quality_check: result.quality_assessment.clone(),
            word_count: result.word_count,
        }
    }

    /// Creates an `error` event.
    #[must_use]
    pub fn error(message: impl Into<String>, stage: Option<StageRole>) -> Self {
        Self::Error {
            message: message.into(),
            stage,
        }
    }

    /// Returns the event name, matching the serialised `type` tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionAssigned { .. } => "sessionAssigned",
            Self::StageStart { .. } => "stageStart",
            Self::StageComplete { .. } => "stageComplete",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// Returns the stage this event concerns, if any.
    #[must_use]
    pub fn stage(&self) -> Option<StageRole> {
        match self {
            Self::StageStart { stage, .. } | Self::StageComplete { stage, .. } => Some(*stage),
            Self::Error { stage, .. } => *stage,
            Self::SessionAssigned { .. } | Self::Complete { .. } => None,
        }
    }

    /// Returns true for `complete` and `error`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}
