//! A deterministic, scriptable inference backend.

use crate::backend::{GenerateRequest, InferenceBackend};
use crate::errors::BackendError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a scripted model answers with.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this text.
    Text(String),
    /// Fail with this error.
    Fail(BackendError),
}

/// Backend that answers from per-model scripts.
///
/// Each model has a queue of one-shot replies and a standing reply used
/// once the queue is empty. Unscripted models answer
/// `"Response from <model>."`. Every request is recorded before any
/// configured delay, so a cancelled call is still visible.
///
/// ```
/// use modelchain::testing::ScriptedBackend;
///
/// let backend = ScriptedBackend::new()
///     .with_response("gemma:2b", "1. Tides\n2. Currents")
///     .with_reply_once("mistral:latest", "I. Intro");
/// assert_eq!(backend.request_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    queued: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    standing: HashMap<String, ScriptedReply>,
    delays: HashMap<String, Duration>,
    models: Option<Vec<String>>,
    models_error: Option<BackendError>,
    requests: Mutex<Vec<GenerateRequest>>,
    completed: AtomicUsize,
}

impl ScriptedBackend {
    /// Creates a backend where every model answers with a stock sentence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the standing text reply for a model.
    #[must_use]
    pub fn with_response(mut self, model: &str, text: impl Into<String>) -> Self {
        self.standing
            .insert(model.to_string(), ScriptedReply::Text(text.into()));
        self
    }

    /// Makes every call to a model fail.
    #[must_use]
    pub fn with_failure(mut self, model: &str, error: BackendError) -> Self {
        self.standing
            .insert(model.to_string(), ScriptedReply::Fail(error));
        self
    }

    /// Queues a one-shot text reply, used before the standing reply.
    #[must_use]
    pub fn with_reply_once(self, model: &str, text: impl Into<String>) -> Self {
        self.queue(model, ScriptedReply::Text(text.into()));
        self
    }

    /// Queues a one-shot failure.
    #[must_use]
    pub fn with_failure_once(self, model: &str, error: BackendError) -> Self {
        self.queue(model, ScriptedReply::Fail(error));
        self
    }

    /// Delays every call to a model.
    #[must_use]
    pub fn with_delay(mut self, model: &str, delay: Duration) -> Self {
        self.delays.insert(model.to_string(), delay);
        self
    }

    /// Sets the installed-model list. Defaults to every scripted model.
    #[must_use]
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = Some(models);
        self
    }

    /// Makes `list_models` fail.
    #[must_use]
    pub fn with_models_error(mut self, error: BackendError) -> Self {
        self.models_error = Some(error);
        self
    }

    fn queue(&self, model: &str, reply: ScriptedReply) {
        self.queued
            .lock()
            .entry(model.to_string())
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, model: &str) -> ScriptedReply {
        if let Some(reply) = self.queued.lock().get_mut(model).and_then(VecDeque::pop_front) {
            return reply;
        }
        self.standing
            .get(model)
            .cloned()
            .unwrap_or_else(|| ScriptedReply::Text(format!("Response from {model}.")))
    }

    /// Returns every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns the number of calls that ran to completion.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Returns the models called, in order.
    #[must_use]
    pub fn models_called(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.model.clone()).collect()
    }

    /// Returns the user prompts sent to `model`, in order.
    #[must_use]
    pub fn prompts_for(&self, model: &str) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.model == model)
            .filter_map(|r| r.prompt().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, BackendError> {
        self.requests.lock().push(request.clone());

        if let Some(delay) = self.delays.get(&request.model) {
            tokio::time::sleep(*delay).await;
        }

        let reply = self.next_reply(&request.model);
        self.completed.fetch_add(1, Ordering::SeqCst);
        match reply {
            ScriptedReply::Text(text) => Ok(text),
            ScriptedReply::Fail(error) => Err(error),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        if let Some(error) = &self.models_error {
            return Err(error.clone());
        }
        if let Some(models) = &self.models {
            return Ok(models.clone());
        }
        let mut models: Vec<String> = self
            .standing
            .keys()
            .chain(self.queued.lock().keys())
            .cloned()
            .collect();
        models.sort();
        models.dedup();
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatMessage;
    use crate::backend::GenerateOptions;
    use crate::config::RuntimeOptions;
    use crate::core::GenerationParams;

    fn request(model: &str, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user(prompt)],
            options: GenerateOptions::new(&GenerationParams::default(), &RuntimeOptions::default()),
        }
    }

    #[tokio::test]
    async fn test_unscripted_model_echoes() {
        let backend = ScriptedBackend::new();
        let text = backend.generate(&request("phi3", "hi")).await.unwrap();
        assert_eq!(text, "Response from phi3.");
    }

    #[tokio::test]
    async fn test_queue_before_standing_reply() {
        let backend = ScriptedBackend::new()
            .with_failure("mistral:latest", BackendError::Unavailable("down".into()))
            .with_reply_once("mistral:latest", "outline");

        assert_eq!(
            backend.generate(&request("mistral:latest", "a")).await.unwrap(),
            "outline"
        );
        assert!(backend.generate(&request("mistral:latest", "b")).await.is_err());
        assert_eq!(backend.prompts_for("mistral:latest"), vec!["a", "b"]);
        assert_eq!(backend.completed_count(), 2);
    }

    #[tokio::test]
    async fn test_list_models_defaults_to_scripted() {
        let backend = ScriptedBackend::new()
            .with_response("b", "x")
            .with_reply_once("a", "y");
        assert_eq!(backend.list_models().await.unwrap(), vec!["a", "b"]);
    }
}
