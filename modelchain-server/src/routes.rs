//! HTTP handlers.

use crate::sse::event_stream;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use modelchain::errors::ChainError;
use modelchain::events::{ChannelEventSink, LoggingEventSink};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Query string of the streaming endpoint.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    topic: Option<String>,
}

/// Query string of the cancel endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelQuery {
    session_id: Option<String>,
}

/// Body of the blocking chain endpoint.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    topic: String,
}

/// A [`ChainError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(ChainError);

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ChainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ChainError::Stage { .. } => StatusCode::BAD_GATEWAY,
            ChainError::Cancelled => StatusCode::CONFLICT,
            ChainError::Config(_) | ChainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let mut body = self.0.to_dict();
        body.insert("error".to_string(), json!(self.0.to_string()));
        (status, Json(body)).into_response()
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// `GET /api/chain/stream?topic=…`
pub async fn chain_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Response {
    let topic = query.topic.unwrap_or_default();
    let session = match state.orchestrator.start(&topic) {
        Ok(session) => session,
        Err(err) => return ApiError(err).into_response(),
    };
    let handle = Arc::clone(session.handle());
    let (sink, rx) = ChannelEventSink::channel();

    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        // Errors were already reported through the sink.
        let _ = orchestrator.execute(session, &sink).await;
        if sink.metrics().dropped() > 0 {
            warn!(dropped = sink.metrics().dropped(), "Events dropped after client left");
        }
    });

    Sse::new(event_stream(rx, handle))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// `GET /api/chain/cancel?sessionId=…`
pub async fn cancel_chain(
    State(state): State<AppState>,
    Query(query): Query<CancelQuery>,
) -> Response {
    let Some(session_id) = query.session_id.filter(|id| !id.trim().is_empty()) else {
        return bad_request("sessionId is required");
    };
    let success = state.orchestrator.cancel(&session_id);
    info!(session_id = %session_id, success, "Cancel requested");
    Json(json!({ "success": success })).into_response()
}

/// `POST /api/chain`
pub async fn run_chain(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Response, ApiError> {
    let result = state
        .orchestrator
        .run(&request.topic, &LoggingEventSink::debug())
        .await?;
    Ok(Json(result).into_response())
}

/// `GET /api/chain/sessions`
pub async fn list_sessions(State(state): State<AppState>) -> Response {
    Json(state.orchestrator.registry().active_sessions()).into_response()
}

/// `GET /api/models`
pub async fn list_models(State(state): State<AppState>) -> Response {
    let stages: Vec<_> = state.orchestrator.plan().iter().collect();
    Json(stages).into_response()
}

/// `GET /api/diagnostics`
pub async fn diagnostics(State(state): State<AppState>) -> Response {
    let backend = state.orchestrator.invoker().backend();
    let (status, reachable, installed, error) = match backend.list_models().await {
        Ok(models) => (StatusCode::OK, true, models, None),
        Err(e) => {
            warn!(error = %e, "Ollama diagnostics failed");
            (StatusCode::SERVICE_UNAVAILABLE, false, Vec::new(), Some(e.to_string()))
        }
    };

    let models: Vec<_> = state
        .orchestrator
        .plan()
        .iter()
        .map(|stage| {
            json!({
                "stage": stage.role,
                "model": stage.model,
                "installed": is_installed(&stage.model, &installed),
            })
        })
        .collect();

    let body = json!({
        "baseUrl": state.config.backend.base_url,
        "reachable": reachable,
        "error": error,
        "models": models,
    });
    (status, Json(body)).into_response()
}

/// Ollama reports untagged models as `name:latest`.
fn is_installed(model: &str, installed: &[String]) -> bool {
    installed.iter().any(|name| {
        name == model || (!model.contains(':') && name.strip_suffix(":latest") == Some(model))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installed_matching() {
        let installed = vec!["mistral:latest".to_string(), "gemma:2b".to_string()];
        assert!(is_installed("mistral:latest", &installed));
        assert!(is_installed("mistral", &installed));
        assert!(is_installed("gemma:2b", &installed));
        assert!(!is_installed("gemma:7b", &installed));
        assert!(!is_installed("llama3:latest", &installed));
    }
}
