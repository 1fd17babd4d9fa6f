//! Stage roles and static stage definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The role a stage plays in the chain.
///
/// The chain topology is fixed: the four mandatory roles run in declaration
/// order, followed by the optional quality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageRole {
    /// Brainstorms article angles for the topic.
    Ideas,
    /// Turns one idea into a structured outline.
    Outline,
    /// Writes a prose draft from the outline.
    Draft,
    /// Produces the final, word-budgeted article.
    Final,
    /// Critiques the final article. Best effort.
    Quality,
}

impl StageRole {
    /// The mandatory stages, in execution order.
    pub const MANDATORY: [Self; 4] = [Self::Ideas, Self::Outline, Self::Draft, Self::Final];

    /// Returns the position of this role in the chain.
    #[must_use]
    pub fn position(self) -> usize {
        match self {
            Self::Ideas => 0,
            Self::Outline => 1,
            Self::Draft => 2,
            Self::Final => 3,
            Self::Quality => 4,
        }
    }

    /// Returns the lowercase name used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ideas => "ideas",
            Self::Outline => "outline",
            Self::Draft => "draft",
            Self::Final => "final",
            Self::Quality => "quality",
        }
    }

    /// Returns true for the best-effort quality stage.
    #[must_use]
    pub fn is_quality(self) -> bool {
        matches!(self, Self::Quality)
    }
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling parameters sent with every request for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Nucleus sampling threshold.
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Top-k sampling cutoff.
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Maximum tokens to generate (`num_predict` on the wire).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_top_k() -> u32 {
    40
}

fn default_max_tokens() -> u32 {
    512
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl GenerationParams {
    /// Creates parameters with the given temperature and token limit.
    #[must_use]
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
            ..Self::default()
        }
    }

    /// Sets the nucleus sampling threshold.
    #[must_use]
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    /// Sets the top-k cutoff.
    #[must_use]
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }
}

/// Static configuration for one pipeline stage.
///
/// The prompt template may reference `{topic}` and `{previous}`; the latter
/// is the cleaned output of the preceding stage and renders empty for the
/// first stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// The role of this stage.
    pub role: StageRole,
    /// The backend model identifier.
    pub model: String,
    /// The system prompt sent ahead of the rendered user prompt.
    pub system_prompt: String,
    /// Sampling parameters.
    #[serde(default)]
    pub params: GenerationParams,
    /// The user prompt template.
    pub prompt_template: String,
}

impl StageDefinition {
    /// Creates a stage definition with default sampling parameters.
    #[must_use]
    pub fn new(
        role: StageRole,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        prompt_template: impl Into<String>,
    ) -> Self {
        Self {
            role,
            model: model.into(),
            system_prompt: system_prompt.into(),
            params: GenerationParams::default(),
            prompt_template: prompt_template.into(),
        }
    }

    /// Sets the sampling parameters.
    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Renders the prompt template in a single pass.
    ///
    /// Placeholder text inside the substituted values is left untouched.
    #[must_use]
    pub fn render(&self, topic: &str, previous: Option<&str>) -> String {
        let template = self.prompt_template.as_str();
        let mut out = String::with_capacity(
            template.len() + topic.len() + previous.map_or(0, str::len),
        );
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix("{topic}") {
                out.push_str(topic);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{previous}") {
                out.push_str(previous.unwrap_or_default());
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}
