//! Stage and chain result types.

use super::{StageRole, StageSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The output of one completed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    /// The stage that produced this result.
    pub stage: StageRole,
    /// The model that served the stage.
    pub model: String,
    /// The text exactly as the backend returned it.
    pub raw_text: String,
    /// The cleaned and formatted text passed to the next stage.
    pub cleaned_text: String,
    /// When the result was produced.
    pub emitted_at: DateTime<Utc>,
}

impl StageResult {
    /// Creates a stage result stamped with the current time.
    #[must_use]
    pub fn new(
        stage: StageRole,
        model: impl Into<String>,
        raw_text: impl Into<String>,
        cleaned_text: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            model: model.into(),
            raw_text: raw_text.into(),
            cleaned_text: cleaned_text.into(),
            emitted_at: Utc::now(),
        }
    }

    /// Returns the whitespace-delimited word count of the cleaned text.
    #[must_use]
    pub fn word_count(&self) -> usize {
        crate::postprocess::word_count(&self.cleaned_text)
    }

    /// Returns the client-facing summary of this result.
    #[must_use]
    pub fn summary(&self) -> StageSummary {
        StageSummary {
            stage: self.stage,
            model: self.model.clone(),
            output: self.cleaned_text.clone(),
        }
    }
}

/// The terminal artifact of a completed chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainResult {
    /// The session that produced this result.
    pub session_id: String,
    /// The validated topic.
    pub topic: String,
    /// The final, word-budgeted article.
    pub final_text: String,
    /// Per-stage outputs in execution order, excluding the quality stage.
    pub stages: Vec<StageResult>,
    /// The quality assessment, if the quality stage is enabled.
    pub quality_assessment: Option<String>,
    /// Word count of `final_text`.
    pub word_count: usize,
}

impl ChainResult {
    /// Returns the cleaned output of a stage.
    #[must_use]
    pub fn stage_output(&self, stage: StageRole) -> Option<&str> {
        self.stages
            .iter()
            .find(|result| result.stage == stage)
            .map(|result| result.cleaned_text.as_str())
    }

    /// Returns client-facing summaries of every stage.
    #[must_use]
    pub fn summaries(&self) -> Vec<StageSummary> {
        self.stages.iter().map(StageResult::summary).collect()
    }
}
