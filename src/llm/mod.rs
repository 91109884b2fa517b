//! External model services: embeddings and grounded answer generation.

pub mod gemini;
pub mod openai;
pub mod provider;
pub mod types;

use std::sync::Arc;

pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatProvider;
pub use provider::LlmProvider;
pub use types::{ChatMessage, ChatRequest};

use crate::core::config::settings::{EmbeddingSettings, LlmSettings};
use crate::core::errors::ApiError;

/// Builds the provider selected by `llm.provider`.
pub fn build_provider(
    llm: &LlmSettings,
    embedding: &EmbeddingSettings,
) -> Result<Arc<dyn LlmProvider>, ApiError> {
    match llm.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiCompatProvider::new(llm, embedding)?)),
        "gemini" => Ok(Arc::new(GeminiProvider::new(llm, embedding)?)),
        other => Err(ApiError::Config(format!("unknown llm provider '{}'", other))),
    }
}
