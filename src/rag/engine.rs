//! AnswerEngine — one question in, one grounded answer out.
//!
//! Holds the handles every request needs (provider, store, retriever,
//! assembler); constructed once at startup and shared. Each call is an
//! independent retrieve → assemble → generate cycle with no cross-query
//! state.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use super::prompt::PromptAssembler;
use super::retriever::{Query, Retriever};
use super::store::{SearchHit, VectorStore};
use crate::core::config::AppConfig;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

/// Excerpt length shown to the user per cited source.
const SOURCE_EXCERPT_CHARS: usize = 300;

/// A cited source excerpt backing an answer.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerSource {
    pub complaint_id: String,
    pub product: String,
    pub excerpt: String,
    pub score: f32,
}

impl AnswerSource {
    fn from_hit(hit: &SearchHit) -> Self {
        let mut excerpt: String = hit.chunk.content.chars().take(SOURCE_EXCERPT_CHARS).collect();
        if excerpt.len() < hit.chunk.content.len() {
            excerpt.push_str("...");
        }

        Self {
            complaint_id: hit.chunk.complaint_id.clone(),
            product: hit.chunk.product.clone(),
            excerpt,
            score: hit.score,
        }
    }
}

/// The outcome of one question. `text` is absent when generation failed
/// after a successful retrieval; `sources` are still populated so the
/// caller can show the evidence without a composed answer.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: Option<String>,
    pub sources: Vec<AnswerSource>,
    pub detail: Option<String>,
}

/// A streaming answer: sources up front, fragments as they arrive.
pub struct AnswerStream {
    pub sources: Vec<AnswerSource>,
    pub fragments: mpsc::Receiver<Result<String, ApiError>>,
}

#[derive(Clone)]
pub struct AnswerEngine {
    provider: Arc<dyn LlmProvider>,
    retriever: Retriever,
    assembler: PromptAssembler,
}

impl AnswerEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
        config: &AppConfig,
    ) -> Self {
        let retriever = Retriever::new(
            provider.clone(),
            store,
            config.retrieval.top_k,
            config.embedding.dimension,
        );
        let assembler = PromptAssembler::new(config.prompt.max_context_chars);

        Self {
            provider,
            retriever,
            assembler,
        }
    }

    /// Answers a question in one shot. Retrieval errors propagate;
    /// generation errors degrade to a sources-only answer.
    pub async fn ask(&self, query: &Query) -> Result<Answer, ApiError> {
        let hits = self.retriever.retrieve(query).await?;
        let sources: Vec<AnswerSource> = hits.iter().map(AnswerSource::from_hit).collect();

        let prompt = self.assembler.assemble(&query.question, &hits);
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]);

        match self.provider.chat(request).await {
            Ok(text) => Ok(Answer {
                text: Some(text),
                sources,
                detail: None,
            }),
            Err(err) => {
                tracing::warn!("generation failed, returning sources only: {}", err);
                Ok(Answer {
                    text: None,
                    sources,
                    detail: Some(err.to_string()),
                })
            }
        }
    }

    /// Streaming variant: the retrieval result is available immediately,
    /// fragments follow on the channel. A generation failure surfaces as a
    /// single error item so the consumer still has the sources.
    pub async fn ask_stream(&self, query: &Query) -> Result<AnswerStream, ApiError> {
        let hits = self.retriever.retrieve(query).await?;
        let sources: Vec<AnswerSource> = hits.iter().map(AnswerSource::from_hit).collect();

        let prompt = self.assembler.assemble(&query.question, &hits);
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]);

        let fragments = match self.provider.stream_chat(request).await {
            Ok(rx) => rx,
            Err(err) => {
                tracing::warn!("stream generation failed, returning sources only: {}", err);
                let (tx, rx) = mpsc::channel(1);
                let _ = tx.send(Err(err)).await;
                rx
            }
        };

        Ok(AnswerStream { sources, fragments })
    }
}
