//! The chain execution loop.

use super::QUALITY_UNAVAILABLE;
use crate::backend::InferenceBackend;
use crate::cancellation::CleanupGuard;
use crate::config::{ChainConfig, ChainPlan};
use crate::core::{ChainEvent, ChainResult, ChainState, StageDefinition, StageResult};
use crate::errors::ChainError;
use crate::events::EventSink;
use crate::invoker::ModelInvoker;
use crate::observability::{SpanTimer, StageSpanAttributes};
use crate::postprocess::{word_count, ResponsePostProcessor};
use crate::session::{CancellationRegistry, ChainSession};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Runs the fixed model chain, one topic per call.
///
/// One orchestrator serves every request; the only state shared between
/// concurrent chains is the injected [`CancellationRegistry`].
///
/// ```no_run
/// use modelchain::prelude::*;
/// use std::sync::Arc;
///
/// # async fn demo() -> Result<(), ChainError> {
/// let config = ChainConfig::default();
/// let backend = Arc::new(OllamaClient::new(&config.backend)?);
/// let orchestrator = ChainOrchestrator::new(&config, backend, Arc::new(CancellationRegistry::new()))?;
///
/// let result = orchestrator.run("renewable energy policy", &LoggingEventSink::info()).await?;
/// println!("{} words", result.word_count);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChainOrchestrator {
    plan: ChainPlan,
    invoker: ModelInvoker,
    postprocessor: ResponsePostProcessor,
    registry: Arc<CancellationRegistry>,
    max_topic_chars: usize,
}

impl ChainOrchestrator {
    /// Creates an orchestrator from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Config`] if the stage list is not the fixed
    /// chain or a cleanup pattern does not compile.
    pub fn new(
        config: &ChainConfig,
        backend: Arc<dyn InferenceBackend>,
        registry: Arc<CancellationRegistry>,
    ) -> Result<Self, ChainError> {
        Ok(Self {
            plan: config.plan()?,
            invoker: ModelInvoker::from_config(backend, &config.backend),
            postprocessor: ResponsePostProcessor::from_config(config)?,
            registry,
            max_topic_chars: config.max_topic_chars,
        })
    }

    /// Overrides the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.invoker = self.invoker.with_timeout(timeout);
        self
    }

    /// Returns the stage plan.
    pub fn plan(&self) -> &ChainPlan {
        &self.plan
    }

    /// Returns the session registry.
    pub fn registry(&self) -> &Arc<CancellationRegistry> {
        &self.registry
    }

    /// Returns the invoker.
    pub fn invoker(&self) -> &ModelInvoker {
        &self.invoker
    }

    /// Validates the topic and registers a new session.
    ///
    /// Nothing is emitted; an invalid topic leaves no trace in the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidInput`] for a blank or over-long topic.
    pub fn start(&self, topic: &str) -> Result<ChainSession, ChainError> {
        let topic = self.validate_topic(topic)?;
        let session = ChainSession::new(topic);

        if !self.registry.register(Arc::clone(session.handle())) {
            return Err(ChainError::Internal(format!(
                "session id {} already registered",
                session.id()
            )));
        }

        info!(session_id = %session.id(), topic = %session.topic(), "Chain session started");
        Ok(session)
    }

    /// Runs a session started with [`start`](Self::start) to completion.
    ///
    /// Emits `sessionAssigned` first and exactly one of `complete` or `error`
    /// last, unless the session is cancelled, in which case emission simply
    /// stops. The session leaves the registry however this future ends,
    /// including when it is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Cancelled`], [`ChainError::Stage`] for a
    /// mandatory stage failure, or [`ChainError::Internal`].
    pub async fn execute(
        &self,
        mut session: ChainSession,
        sink: &dyn EventSink,
    ) -> Result<ChainResult, ChainError> {
        let session_id = session.id().to_string();
        let _deregister = {
            let registry = Arc::clone(&self.registry);
            let id = session_id.clone();
            CleanupGuard::new(move || {
                registry.deregister(&id);
            })
        };

        sink.emit(ChainEvent::session_assigned(&session_id));
        let timer = SpanTimer::start(&session_id);

        let outcome = AssertUnwindSafe(self.run_stages(&mut session, sink))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                error!(session_id = %session_id, panic = %panic_message(payload.as_ref()), "Chain panicked");
                Err(ChainError::Internal("unexpected failure while running the chain".to_string()))
            });

        match outcome {
            Ok(result) => {
                info!(
                    session_id = %session_id,
                    words = result.word_count,
                    duration_ms = timer.finish(),
                    "Chain completed"
                );
                Ok(result)
            }
            Err(err) => {
                session.abort();
                if err.is_cancellation() {
                    info!(
                        session_id = %session_id,
                        reason = session.token().reason().unwrap_or_default(),
                        "Chain cancelled"
                    );
                } else {
                    error!(session_id = %session_id, stage = ?err.stage(), error = %err, "Chain aborted");
                    sink.emit(ChainEvent::error(err.to_string(), err.stage()));
                }
                Err(err)
            }
        }
    }

    /// Validates, registers and runs a chain.
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start) and [`execute`](Self::execute).
    pub async fn run(&self, topic: &str, sink: &dyn EventSink) -> Result<ChainResult, ChainError> {
        let session = self.start(topic)?;
        self.execute(session, sink).await
    }

    /// Cancels a running session by id.
    ///
    /// Returns true only if this call moved a live session to cancelled.
    pub fn cancel(&self, session_id: &str) -> bool {
        self.registry.cancel(session_id)
    }

    fn validate_topic(&self, topic: &str) -> Result<String, ChainError> {
        let chars = topic.chars().count();
        if chars > self.max_topic_chars {
            return Err(ChainError::InvalidInput(format!(
                "topic is {chars} characters; the limit is {}",
                self.max_topic_chars
            )));
        }
        let trimmed = topic.trim();
        if trimmed.is_empty() {
            return Err(ChainError::InvalidInput("topic must not be empty".to_string()));
        }
        Ok(trimmed.to_string())
    }

    async fn run_stages(
        &self,
        session: &mut ChainSession,
        sink: &dyn EventSink,
    ) -> Result<ChainResult, ChainError> {
        for stage in self.plan.mandatory() {
            let result = self.run_stage(session, stage, sink).await?;
            session.record(result);
        }

        let final_text = session.last_output().unwrap_or_default().to_string();

        let quality_assessment = match self.plan.quality() {
            Some(stage) => Some(self.run_stage(session, stage, sink).await?.cleaned_text),
            None => None,
        };

        session.ensure_active()?;
        session.transition(ChainState::Complete)?;

        let result = ChainResult {
            session_id: session.id().to_string(),
            topic: session.topic().to_string(),
            word_count: word_count(&final_text),
            final_text,
            stages: session.take_outputs(),
            quality_assessment,
        };
        sink.emit(ChainEvent::complete(&result));
        Ok(result)
    }

    async fn run_stage(
        &self,
        session: &mut ChainSession,
        stage: &StageDefinition,
        sink: &dyn EventSink,
    ) -> Result<StageResult, ChainError> {
        session.ensure_active()?;
        session.transition(ChainState::Stage(stage.role))?;
        sink.emit(ChainEvent::stage_start(stage.role, &stage.model));

        let prompt = stage.render(session.topic(), session.last_output());
        let timer = SpanTimer::start(stage.role.as_str());
        let outcome = self.invoker.invoke(stage, &prompt, session.token()).await;
        session.ensure_active()?;

        let mut span = StageSpanAttributes::new(stage.role, &stage.model);
        let (raw, cleaned) = match outcome {
            Ok(raw) => {
                let cleaned = self.postprocessor.process(stage.role, &raw);
                span = span.with_status("completed").with_word_count(word_count(&cleaned));
                (raw, cleaned)
            }
            Err(err) if stage.role.is_quality() => {
                span = span.with_status("degraded").with_error(err.to_string());
                (String::new(), QUALITY_UNAVAILABLE.to_string())
            }
            Err(err) => {
                span.with_status("failed")
                    .with_duration_ms(timer.finish())
                    .with_error(err.to_string())
                    .log(session.id());
                return Err(ChainError::from_invoke(stage.role, err));
            }
        };
        span.with_duration_ms(timer.finish()).log(session.id());

        let result = StageResult::new(stage.role, &stage.model, raw, cleaned);
        sink.emit(ChainEvent::stage_complete(&result));
        Ok(result)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
