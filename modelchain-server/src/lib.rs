//! HTTP and server-sent-events front end for the modelchain engine.
//!
//! Routes:
//! - `GET /api/chain/stream?topic=…` streams chain progress as SSE
//! - `GET /api/chain/cancel?sessionId=…` cancels a running chain
//! - `POST /api/chain` runs a chain and returns the full result
//! - `GET /api/chain/sessions` lists running chains
//! - `GET /api/models` lists the configured stages
//! - `GET /api/diagnostics` checks Ollama and the configured models

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod args;
pub mod routes;
pub mod sse;

use axum::routing::{get, post};
use axum::Router;
use modelchain::backend::InferenceBackend;
use modelchain::config::ChainConfig;
use modelchain::errors::ChainError;
use modelchain::orchestrator::ChainOrchestrator;
use modelchain::session::CancellationRegistry;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The chain engine.
    pub orchestrator: Arc<ChainOrchestrator>,
    /// The loaded configuration.
    pub config: Arc<ChainConfig>,
}

impl AppState {
    /// Builds the orchestrator and a fresh session registry.
    pub fn new(config: ChainConfig, backend: Arc<dyn InferenceBackend>) -> Result<Self, ChainError> {
        let registry = Arc::new(CancellationRegistry::new());
        let orchestrator = ChainOrchestrator::new(&config, backend, registry)?;
        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
        })
    }

    /// Returns the session registry.
    pub fn registry(&self) -> &Arc<CancellationRegistry> {
        self.orchestrator.registry()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chain", post(routes::run_chain))
        .route("/api/chain/stream", get(routes::chain_stream))
        .route("/api/chain/cancel", get(routes::cancel_chain))
        .route("/api/chain/sessions", get(routes::list_sessions))
        .route("/api/models", get(routes::list_models))
        .route("/api/diagnostics", get(routes::diagnostics))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use modelchain::errors::BackendError;
    use modelchain::testing::ScriptedBackend;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app_with(backend: ScriptedBackend) -> (Router, AppState) {
        let state = AppState::new(ChainConfig::default(), Arc::new(backend)).unwrap();
        (router(state.clone()), state)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_run_chain_returns_result() {
        let (app, state) = app_with(ScriptedBackend::new());
        let (status, body) = send(
            app,
            post_json("/api/chain", &serde_json::json!({"topic": "renewable energy policy"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["topic"], "renewable energy policy");
        assert_eq!(json["stages"].as_array().unwrap().len(), 4);
        assert!(json["wordCount"].as_u64().unwrap() <= 750);
        assert!(state.registry().is_empty());
    }

    #[tokio::test]
    async fn test_run_chain_rejects_long_topic() {
        let (app, _) = app_with(ScriptedBackend::new());
        let topic = "x".repeat(201);
        let (status, body) = send(app, post_json("/api/chain", &serde_json::json!({"topic": topic}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["type"], "InvalidInput");
        assert!(json["error"].as_str().unwrap().contains("201"));
    }

    #[tokio::test]
    async fn test_run_chain_stage_failure_is_bad_gateway() {
        let backend = ScriptedBackend::new()
            .with_failure("zephyr-7b:latest", BackendError::Unavailable("connection refused".into()));
        let (app, _) = app_with(backend);
        let (status, body) = send(app, post_json("/api/chain", &serde_json::json!({"topic": "tides"}))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["stage"], "draft");
        assert_eq!(json["type"], "BackendUnavailable");
    }

    #[tokio::test]
    async fn test_stream_emits_events_in_order() {
        let (app, state) = app_with(ScriptedBackend::new());
        let resp = app
            .oneshot(get_req("/api/chain/stream?topic=renewable%20energy%20policy"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "text/event-stream");

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        let names: Vec<&str> = body
            .lines()
            .filter_map(|line| line.strip_prefix("event: "))
            .collect();

        assert_eq!(names.first(), Some(&"sessionAssigned"));
        assert_eq!(names.last(), Some(&"complete"));
        assert_eq!(names.iter().filter(|n| **n == "stageComplete").count(), 5);
        assert!(body.contains(r#""stage":"final""#));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(state.registry().is_empty());
    }

    #[tokio::test]
    async fn test_stream_rejects_invalid_topic_before_streaming() {
        let (app, state) = app_with(ScriptedBackend::new());
        let topic = "y".repeat(201);
        let (status, body) = send(app, get_req(&format!("/api/chain/stream?topic={topic}"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("error"));
        assert!(!body.contains("sessionAssigned"));
        assert!(state.registry().is_empty());

        let (app, _) = app_with(ScriptedBackend::new());
        let (status, _) = send(app, get_req("/api/chain/stream")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cancel_requires_session_id() {
        let (app, _) = app_with(ScriptedBackend::new());
        let (status, _) = send(app, get_req("/api/chain/cancel")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cancel_unknown_session_is_not_success() {
        let (app, _) = app_with(ScriptedBackend::new());
        let (status, body) = send(app, get_req("/api/chain/cancel?sessionId=nope")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), serde_json::json!({"success": false}));
    }

    #[tokio::test]
    async fn test_cancel_running_session() {
        let backend = ScriptedBackend::new().with_delay("gemma:2b", Duration::from_secs(30));
        let (app, state) = app_with(backend);

        let session = state.orchestrator.start("tides").unwrap();
        let id = session.id().to_string();
        let orchestrator = Arc::clone(&state.orchestrator);
        let task = tokio::spawn(async move {
            orchestrator
                .execute(session, &modelchain::events::NoOpEventSink)
                .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (_, sessions) = send(app.clone(), get_req("/api/chain/sessions")).await;
        let sessions: Value = serde_json::from_str(&sessions).unwrap();
        assert_eq!(sessions[0]["sessionId"], id.as_str());

        let (_, body) = send(app, get_req(&format!("/api/chain/cancel?sessionId={id}"))).await;
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["success"], true);

        let outcome = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert!(outcome.unwrap_err().is_cancellation());
    }

    #[tokio::test]
    async fn test_models_lists_configured_stages() {
        let (app, _) = app_with(ScriptedBackend::new());
        let (status, body) = send(app, get_req("/api/models")).await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        let roles: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["ideas", "outline", "draft", "final", "quality"]);
    }

    #[tokio::test]
    async fn test_diagnostics_reports_installed_models() {
        let backend = ScriptedBackend::new()
            .with_models(vec!["gemma:2b".to_string(), "mistral:latest".to_string()]);
        let (app, _) = app_with(backend);
        let (status, body) = send(app, get_req("/api/diagnostics")).await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["reachable"], true);
        assert_eq!(json["models"][0]["installed"], true);
        assert_eq!(json["models"][2]["model"], "zephyr-7b:latest");
        assert_eq!(json["models"][2]["installed"], false);
    }

    #[tokio::test]
    async fn test_diagnostics_reports_unreachable_backend() {
        let backend = ScriptedBackend::new()
            .with_models_error(BackendError::Unavailable("connection refused".into()));
        let (app, _) = app_with(backend);
        let (status, body) = send(app, get_req("/api/diagnostics")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["reachable"], false);
        assert!(json["error"].as_str().unwrap().contains("connection refused"));
    }
}
