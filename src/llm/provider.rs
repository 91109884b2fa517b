use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

/// Boundary to the external model services. One provider serves both the
/// embedding endpoint and the generative endpoint so index-time and
/// query-time embeddings always come from the same place.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "openai", "gemini").
    fn name(&self) -> &str;

    /// Check if the provider is reachable.
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// Chat completion (non-streaming).
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError>;

    /// Chat completion delivered as a sequence of text fragments. The
    /// consumer may stop early by dropping the receiver.
    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError>;

    /// Generate one embedding vector per input.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}
