//! HTTP client for a local Ollama runtime.

use super::ndjson::decode_chat_stream;
use super::types::{ChatRequestBody, ChatResponseBody, GenerateRequest, TagsResponseBody};
use super::{InferenceBackend, TextStream};
use crate::config::BackendConfig;
use crate::errors::{BackendError, ConfigError};
use async_trait::async_trait;
use tracing::debug;

/// [`InferenceBackend`] speaking the Ollama `/api/chat` protocol.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// Creates a client from backend configuration.
    ///
    /// Per-call deadlines are enforced by the invoker; the client only
    /// bounds connection setup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self::with_client(http, &config.base_url))
    }

    /// Creates a client around an existing `reqwest` client.
    #[must_use]
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_chat(
        &self,
        request: &GenerateRequest,
        stream: bool,
    ) -> Result<reqwest::Response, BackendError> {
        let body = ChatRequestBody {
            model: &request.model,
            messages: &request.messages,
            options: &request.options,
            stream,
        };
        debug!(model = %request.model, stream, "POST /api/chat");

        let response = self.http.post(self.url("/api/chat")).json(&body).send().await?;
        ensure_success(response).await
    }
}

/// Maps non-2xx responses to [`BackendError::Status`], preferring the
/// `{error}` message Ollama puts in the body.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ChatResponseBody>(&text)
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                text
            }
        });
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, BackendError> {
        let response = self.post_chat(request, false).await?;
        let body: ChatResponseBody = response.json().await?;
        if let Some(error) = body.error {
            return Err(BackendError::Remote(error));
        }

        let content = body.into_content();
        if content.trim().is_empty() {
            return Err(BackendError::Empty);
        }
        Ok(content)
    }

    async fn generate_stream(&self, request: &GenerateRequest) -> Result<TextStream, BackendError> {
        let response = self.post_chat(request, true).await?;
        Ok(decode_chat_stream(response.bytes_stream()))
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let response = self.http.get(self.url("/api/tags")).send().await?;
        let body: TagsResponseBody = ensure_success(response).await?.json().await?;
        Ok(body.models.into_iter().map(|tag| tag.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeOptions;
    use crate::core::{StageDefinition, StageRole};
    use futures::StreamExt;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> OllamaClient {
        let config = BackendConfig {
            base_url: format!("{}/", server.base_url()),
            ..BackendConfig::default()
        };
        OllamaClient::new(&config).unwrap()
    }

    fn request() -> GenerateRequest {
        let stage = StageDefinition::new(StageRole::Ideas, "gemma:2b", "Be creative.", "{topic}");
        GenerateRequest::for_stage(&stage, "List 5 angles for an article on: tides", &RuntimeOptions::default())
    }

    #[tokio::test]
    async fn test_generate_blocking() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/chat")
                    .json_body_partial(r#"{"model":"gemma:2b","stream":false,"options":{"num_predict":512,"top_k":40}}"#);
                then.status(200).json_body(json!({
                    "model": "gemma:2b",
                    "message": {"role": "assistant", "content": "1. Energy\n2. Ecology"},
                    "done": true
                }));
            })
            .await;

        let text = client(&server).generate(&request()).await.unwrap();
        assert_eq!(text, "1. Energy\n2. Ecology");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_sends_system_then_user() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat").json_body_partial(
                    r#"{"messages":[{"role":"system","content":"Be creative."},{"role":"user","content":"List 5 angles for an article on: tides"}]}"#,
                );
                then.status(200)
                    .json_body(json!({"message": {"content": "ok"}, "done": true}));
            })
            .await;

        client(&server).generate(&request()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_error_uses_error_payload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat");
                then.status(404)
                    .json_body(json!({"error": "model 'gemma:2b' not found"}));
            })
            .await;

        let err = client(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::Status { status: 404, ref message } if message == "model 'gemma:2b' not found"
        ));
    }

    #[tokio::test]
    async fn test_error_payload_with_ok_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat");
                then.status(200).json_body(json!({"error": "runner crashed"}));
            })
            .await;

        let err = client(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, BackendError::Remote(_)));
    }

    #[tokio::test]
    async fn test_blank_content_is_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat");
                then.status(200)
                    .json_body(json!({"message": {"content": "  \n"}, "done": true}));
            })
            .await;

        let err = client(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, BackendError::Empty));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat");
                then.status(200).body("<html>proxy</html>");
            })
            .await;

        let err = client(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_generate_stream() {
        let server = MockServer::start_async().await;
        let body = concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Tides \"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"matter.\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n"
        );
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/chat")
                    .json_body_partial(r#"{"stream":true}"#);
                then.status(200).body(body);
            })
            .await;

        let stream = client(&server).generate_stream(&request()).await.unwrap();
        let chunks: Vec<String> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks.concat(), "Tides matter.");
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/tags");
                then.status(200).json_body(json!({
                    "models": [{"name": "gemma:2b", "size": 1}, {"name": "llama3:latest"}]
                }));
            })
            .await;

        let models = client(&server).list_models().await.unwrap();
        assert_eq!(models, vec!["gemma:2b".to_string(), "llama3:latest".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let config = BackendConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..BackendConfig::default()
        };
        let err = OllamaClient::new(&config)
            .unwrap()
            .generate(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }
}
