//! Shared test doubles for the retrieval pipeline.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::errors::ApiError;
use crate::llm::types::ChatRequest;
use crate::llm::LlmProvider;

/// Provider stub with canned embeddings and completions.
pub struct StubProvider {
    embedding: Option<Vec<f32>>,
    answer: Option<String>,
    fail_embed: bool,
    fail_chat: bool,
}

impl StubProvider {
    /// Embeds every input to the same vector; chat succeeds with a fixed
    /// answer.
    pub fn embedding(embedding: Vec<f32>) -> Self {
        Self {
            embedding: Some(embedding),
            answer: Some("stub answer".to_string()),
            fail_embed: false,
            fail_chat: false,
        }
    }

    pub fn with_answer(embedding: Vec<f32>, answer: &str) -> Self {
        Self {
            embedding: Some(embedding),
            answer: Some(answer.to_string()),
            fail_embed: false,
            fail_chat: false,
        }
    }

    /// Both endpoints fail.
    pub fn failing() -> Self {
        Self {
            embedding: None,
            answer: None,
            fail_embed: true,
            fail_chat: true,
        }
    }

    /// Embedding works; generation fails.
    pub fn chat_failing(embedding: Vec<f32>) -> Self {
        Self {
            embedding: Some(embedding),
            answer: None,
            fail_embed: false,
            fail_chat: true,
        }
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(!self.fail_chat)
    }

    async fn chat(&self, _request: ChatRequest) -> Result<String, ApiError> {
        if self.fail_chat {
            return Err(ApiError::Generation("stub generation outage".to_string()));
        }
        Ok(self.answer.clone().unwrap_or_default())
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
        let answer = self.chat(request).await?;
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            let mid = answer.len() / 2;
            let _ = tx.send(Ok(answer[..mid].to_string())).await;
            let _ = tx.send(Ok(answer[mid..].to_string())).await;
        });
        Ok(rx)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if self.fail_embed {
            return Err(ApiError::Internal("stub embedder outage".to_string()));
        }
        let embedding = self.embedding.clone().unwrap_or_default();
        Ok(vec![embedding; inputs.len()])
    }
}
