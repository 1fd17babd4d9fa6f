//! Request and wire types for the inference backend.

use crate::config::RuntimeOptions;
use crate::core::{GenerationParams, StageDefinition};
use serde::{Deserialize, Serialize};

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions.
    System,
    /// The prompt.
    User,
    /// Model output.
    Assistant,
}

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The speaker.
    pub role: ChatRole,
    /// The text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Sampling and runtime options, serialised exactly as Ollama expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub num_predict: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_thread: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_batch: Option<u32>,
}

impl GenerateOptions {
    /// Combines stage sampling parameters with backend runtime options.
    #[must_use]
    pub fn new(params: &GenerationParams, runtime: &RuntimeOptions) -> Self {
        Self {
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            num_predict: params.max_tokens,
            num_thread: runtime.num_thread,
            num_ctx: runtime.num_ctx,
            num_batch: runtime.num_batch,
        }
    }
}

/// A single generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// The model identifier.
    pub model: String,
    /// System prompt followed by the user prompt.
    pub messages: Vec<ChatMessage>,
    /// Sampling and runtime options.
    pub options: GenerateOptions,
}

impl GenerateRequest {
    /// Builds the request for one stage invocation.
    #[must_use]
    pub fn for_stage(stage: &StageDefinition, prompt: &str, runtime: &RuntimeOptions) -> Self {
        Self {
            model: stage.model.clone(),
            messages: vec![
                ChatMessage::system(stage.system_prompt.clone()),
                ChatMessage::user(prompt),
            ],
            options: GenerateOptions::new(&stage.params, runtime),
        }
    }

    /// Returns the user prompt, if present.
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequestBody<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub options: &'a GenerateOptions,
    pub stream: bool,
}

/// One `/api/chat` response object; streaming sends one per line.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChatResponseBody {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: String,
}

impl ChatResponseBody {
    pub(crate) fn into_content(self) -> String {
        self.message.map(|m| m.content).unwrap_or_default()
    }
}

/// Body of `GET /api/tags`.
#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponseBody {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelTag {
    pub name: String,
}
