//! Inference backend abstraction and the Ollama client.

mod ndjson;
mod ollama;
mod types;

pub use ndjson::{decode_chat_stream, NdjsonDecoder, StreamLine};
pub use ollama::OllamaClient;
pub use types::{ChatMessage, ChatRole, GenerateOptions, GenerateRequest};

use crate::errors::BackendError;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// A stream of generated text fragments.
pub type TextStream = BoxStream<'static, Result<String, BackendError>>;

/// A model runtime that turns chat messages into text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Generates a complete response.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, BackendError>;

    /// Generates a response as a stream of fragments.
    ///
    /// The default implementation yields the blocking response as a single
    /// fragment.
    async fn generate_stream(&self, request: &GenerateRequest) -> Result<TextStream, BackendError> {
        let text = self.generate(request).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }

    /// Lists the models installed on the backend.
    async fn list_models(&self) -> Result<Vec<String>, BackendError>;
}
