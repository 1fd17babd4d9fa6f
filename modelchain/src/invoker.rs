//! Single-stage model invocation with cancellation and deadlines.

use crate::backend::{GenerateRequest, InferenceBackend};
use crate::cancellation::CancellationToken;
use crate::config::{BackendConfig, RuntimeOptions};
use crate::core::StageDefinition;
use crate::errors::{BackendError, InvokeError};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Calls the backend for one stage and classifies the outcome.
///
/// Every call races three things: the backend, the session's cancellation
/// token and the per-call deadline. Losing futures are dropped, which
/// aborts the underlying HTTP request. There are no retries.
#[derive(Clone)]
pub struct ModelInvoker {
    backend: Arc<dyn InferenceBackend>,
    timeout: Duration,
    streaming: bool,
    runtime: RuntimeOptions,
}

impl ModelInvoker {
    /// Creates a blocking-mode invoker with a 60 second deadline.
    #[must_use]
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            backend,
            timeout: Duration::from_secs(60),
            streaming: false,
            runtime: RuntimeOptions::default(),
        }
    }

    /// Creates an invoker using the deadline, mode and runtime options of
    /// `config`.
    #[must_use]
    pub fn from_config(backend: Arc<dyn InferenceBackend>, config: &BackendConfig) -> Self {
        Self {
            backend,
            timeout: config.timeout(),
            streaming: config.stream,
            runtime: config.runtime,
        }
    }

    /// Sets the per-call deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Consumes the backend's chunk stream instead of one response.
    #[must_use]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Returns the per-call deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn InferenceBackend> {
        &self.backend
    }

    /// Invokes `stage` with a rendered prompt.
    ///
    /// # Errors
    ///
    /// - [`InvokeError::Cancelled`] if `token` is cancelled before or during
    ///   the call; an already-cancelled token never reaches the backend
    /// - [`InvokeError::Timeout`] when the deadline elapses
    /// - [`InvokeError::BackendUnavailable`] for transport or HTTP failures
    /// - [`InvokeError::EmptyResponse`] for malformed or blank output
    pub async fn invoke(
        &self,
        stage: &StageDefinition,
        prompt: &str,
        token: &CancellationToken,
    ) -> Result<String, InvokeError> {
        if token.is_cancelled() {
            return Err(InvokeError::Cancelled);
        }

        let request = GenerateRequest::for_stage(stage, prompt, &self.runtime);
        debug!(
            stage = %stage.role,
            model = %stage.model,
            prompt_chars = prompt.len(),
            streaming = self.streaming,
            "Invoking model"
        );

        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(stage = %stage.role, "Invocation dropped on cancellation");
                return Err(InvokeError::Cancelled);
            }
            outcome = tokio::time::timeout(self.timeout, self.call(&request)) => outcome,
        };

        match outcome {
            Err(_) => {
                warn!(stage = %stage.role, model = %stage.model, timeout_s = self.timeout.as_secs_f64(), "Model call timed out");
                Err(self.timeout_error())
            }
            Ok(Err(BackendError::Timeout)) => Err(self.timeout_error()),
            Ok(Err(e)) => Err(InvokeError::from(e)),
            Ok(Ok(text)) if text.trim().is_empty() => Err(InvokeError::EmptyResponse(format!(
                "model {} returned no content",
                stage.model
            ))),
            Ok(Ok(text)) => Ok(text),
        }
    }

    async fn call(&self, request: &GenerateRequest) -> Result<String, BackendError> {
        if !self.streaming {
            return self.backend.generate(request).await;
        }

        let mut stream = self.backend.generate_stream(request).await?;
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }

    fn timeout_error(&self) -> InvokeError {
        InvokeError::Timeout {
            seconds: self.timeout.as_secs_f64(),
        }
    }
}

impl std::fmt::Debug for ModelInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelInvoker")
            .field("timeout", &self.timeout)
            .field("streaming", &self.streaming)
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockInferenceBackend;
    use crate::core::StageRole;
    use crate::testing::ScriptedBackend;
    use std::time::Instant;

    fn stage() -> StageDefinition {
        StageDefinition::new(StageRole::Draft, "zephyr-7b:latest", "Rewrite.", "{previous}")
    }

    #[tokio::test]
    async fn test_cancelled_token_never_calls_backend() {
        let mut backend = MockInferenceBackend::new();
        backend.expect_generate().times(0);
        let invoker = ModelInvoker::new(Arc::new(backend));

        let token = CancellationToken::new();
        token.cancel("client");

        let err = invoker.invoke(&stage(), "prompt", &token).await.unwrap_err();
        assert!(err.is_cancellation());
    }

    #[tokio::test]
    async fn test_successful_invocation() {
        let mut backend = MockInferenceBackend::new();
        backend
            .expect_generate()
            .withf(|req| req.model == "zephyr-7b:latest" && req.prompt() == Some("outline text"))
            .times(1)
            .returning(|_| Ok("A persuasive draft.".to_string()));
        let invoker = ModelInvoker::new(Arc::new(backend));

        let text = invoker
            .invoke(&stage(), "outline text", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "A persuasive draft.");
    }

    #[tokio::test]
    async fn test_blank_response_is_empty_response() {
        let mut backend = MockInferenceBackend::new();
        backend.expect_generate().returning(|_| Ok("   \n".to_string()));
        let invoker = ModelInvoker::new(Arc::new(backend));

        let err = invoker
            .invoke(&stage(), "p", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::EmptyResponse(_)));
    }

    #[tokio::test]
    async fn test_backend_failures_are_classified() {
        let mut backend = MockInferenceBackend::new();
        backend
            .expect_generate()
            .returning(|_| Err(BackendError::Unavailable("connection refused".into())));
        let invoker = ModelInvoker::new(Arc::new(backend));

        let err = invoker
            .invoke(&stage(), "p", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::BackendUnavailable(_)));
        assert!(!err.is_cancellation());
    }

    #[tokio::test]
    async fn test_client_timeout_reports_invoker_deadline() {
        let mut backend = MockInferenceBackend::new();
        backend.expect_generate().returning(|_| Err(BackendError::Timeout));
        let invoker = ModelInvoker::new(Arc::new(backend)).with_timeout(Duration::from_secs(30));

        let err = invoker
            .invoke(&stage(), "p", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Timeout { seconds } if (seconds - 30.0).abs() < f64::EPSILON));
    }

    #[tokio::test]
    async fn test_deadline_elapses() {
        let backend = ScriptedBackend::new().with_delay("zephyr-7b:latest", Duration::from_secs(5));
        let invoker = ModelInvoker::new(Arc::new(backend)).with_timeout(Duration::from_millis(50));

        let started = Instant::now();
        let err = invoker
            .invoke(&stage(), "p", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_cancel_during_call_drops_request() {
        let backend = Arc::new(
            ScriptedBackend::new().with_delay("zephyr-7b:latest", Duration::from_secs(5)),
        );
        let invoker = ModelInvoker::new(backend.clone());
        let token = Arc::new(CancellationToken::new());

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                token.cancel("client");
            })
        };

        let started = Instant::now();
        let err = invoker.invoke(&stage(), "p", &token).await.unwrap_err();
        canceller.await.unwrap();

        assert!(err.is_cancellation());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(backend.request_count(), 1);
        assert_eq!(backend.completed_count(), 0);
    }

    #[tokio::test]
    async fn test_streaming_mode_concatenates_chunks() {
        let mut backend = MockInferenceBackend::new();
        backend.expect_generate().times(0);
        backend.expect_generate_stream().returning(|_| {
            let chunks = vec![Ok("Tides ".to_string()), Ok("turn.".to_string())];
            Ok(futures::stream::iter(chunks).boxed())
        });
        let invoker = ModelInvoker::new(Arc::new(backend)).with_streaming(true);

        let text = invoker
            .invoke(&stage(), "p", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "Tides turn.");
    }

    #[tokio::test]
    async fn test_streaming_error_mid_stream() {
        let mut backend = MockInferenceBackend::new();
        backend.expect_generate_stream().returning(|_| {
            let chunks = vec![
                Ok("partial".to_string()),
                Err(BackendError::Remote("runner crashed".into())),
            ];
            Ok(futures::stream::iter(chunks).boxed())
        });
        let invoker = ModelInvoker::new(Arc::new(backend)).with_streaming(true);

        let err = invoker
            .invoke(&stage(), "p", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::BackendUnavailable(_)));
    }

    #[test]
    fn test_from_config() {
        let config = BackendConfig {
            timeout_seconds: 12,
            stream: true,
            ..BackendConfig::default()
        };
        let invoker = ModelInvoker::from_config(Arc::new(ScriptedBackend::new()), &config);
        assert_eq!(invoker.timeout(), Duration::from_secs(12));
        assert!(invoker.streaming);
    }
}
