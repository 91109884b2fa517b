//! Retriever — embeds a question and fetches the nearest complaint chunks.

use std::sync::Arc;

use serde::Deserialize;

use super::store::{SearchHit, VectorStore};
use crate::core::errors::ApiError;
use crate::ingest::normalize::normalize_text;
use crate::llm::LlmProvider;

/// One user question, optionally narrowed to a product category.
#[derive(Debug, Clone, Deserialize)]
pub struct Query {
    pub question: String,
    pub product: Option<String>,
    pub top_k: Option<usize>,
}

#[derive(Clone)]
pub struct Retriever {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStore>,
    default_top_k: usize,
    expected_dimension: usize,
}

impl Retriever {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
        default_top_k: usize,
        expected_dimension: usize,
    ) -> Self {
        Self {
            provider,
            store,
            default_top_k,
            expected_dimension,
        }
    }

    /// Read-only against the index. An empty index or a filter matching
    /// nothing yields an empty result; a failing index or embedder yields
    /// a retrieval error.
    pub async fn retrieve(&self, query: &Query) -> Result<Vec<SearchHit>, ApiError> {
        let normalized = normalize_text(&query.question);
        if normalized.is_empty() {
            return Err(ApiError::BadRequest(
                "question must not be empty".to_string(),
            ));
        }

        let embeddings = self
            .provider
            .embed(&[normalized])
            .await
            .map_err(|e| ApiError::Retrieval(format!("question embedding failed: {}", e)))?;

        let query_embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Retrieval("embedder returned no vector".to_string()))?;

        if query_embedding.len() != self.expected_dimension {
            return Err(ApiError::Config(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.expected_dimension,
                query_embedding.len()
            )));
        }

        let k = query.top_k.unwrap_or(self.default_top_k);
        let product = query.product.as_deref().filter(|p| !p.trim().is_empty());

        self.store
            .search(&query_embedding, k, product)
            .await
            .map_err(|e| ApiError::Retrieval(format!("index query failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::sqlite::SqliteVectorStore;
    use crate::rag::store::IndexedChunk;
    use crate::rag::testutil::StubProvider;

    fn chunk(id: &str, complaint_id: &str, product: &str, content: &str) -> IndexedChunk {
        IndexedChunk {
            chunk_id: id.to_string(),
            complaint_id: complaint_id.to_string(),
            product: product.to_string(),
            date_received: None,
            chunk_index: 0,
            start_offset: 0,
            content: content.to_string(),
        }
    }

    async fn seeded_store() -> (Arc<SqliteVectorStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteVectorStore::with_path(dir.path().join("index.db"))
            .await
            .unwrap();

        store
            .upsert_batch(vec![
                (
                    chunk("c1", "1001", "Credit card", "my card was charged twice"),
                    vec![1.0, 0.0, 0.0],
                ),
                (
                    chunk("c2", "1002", "Personal loan", "loan payoff was misapplied"),
                    vec![0.0, 1.0, 0.0],
                ),
                (
                    chunk("c3", "1003", "Credit card", "late fee after autopay"),
                    vec![0.7, 0.3, 0.0],
                ),
            ])
            .await
            .unwrap();

        (Arc::new(store), dir)
    }

    #[tokio::test]
    async fn retrieves_most_similar_chunk_first() {
        let (store, _dir) = seeded_store().await;
        let provider = Arc::new(StubProvider::embedding(vec![1.0, 0.0, 0.0]));
        let retriever = Retriever::new(provider, store, 5, 3);

        let hits = retriever
            .retrieve(&Query {
                question: "Was my card charged twice?".to_string(),
                product: None,
                top_k: None,
            })
            .await
            .unwrap();

        assert_eq!(hits[0].chunk.chunk_id, "c1");
        assert!(hits.len() <= 5);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn product_filter_limits_results() {
        let (store, _dir) = seeded_store().await;
        let provider = Arc::new(StubProvider::embedding(vec![1.0, 0.0, 0.0]));
        let retriever = Retriever::new(provider, store, 3, 3);

        let hits = retriever
            .retrieve(&Query {
                question: "charged twice for the same purchase".to_string(),
                product: Some("Credit card".to_string()),
                top_k: Some(3),
            })
            .await
            .unwrap();

        assert!(hits.len() <= 3);
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.chunk.product == "Credit card"));
    }

    #[tokio::test]
    async fn empty_question_is_bad_request() {
        let (store, _dir) = seeded_store().await;
        let provider = Arc::new(StubProvider::embedding(vec![1.0, 0.0, 0.0]));
        let retriever = Retriever::new(provider, store, 5, 3);

        let err = retriever
            .retrieve(&Query {
                question: "   ".to_string(),
                product: None,
                top_k: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn embedder_failure_is_retrieval_error() {
        let (store, _dir) = seeded_store().await;
        let provider = Arc::new(StubProvider::failing());
        let retriever = Retriever::new(provider, store, 5, 3);

        let err = retriever
            .retrieve(&Query {
                question: "anything".to_string(),
                product: None,
                top_k: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Retrieval(_)));
    }

    #[tokio::test]
    async fn dimension_mismatch_is_config_error() {
        let (store, _dir) = seeded_store().await;
        let provider = Arc::new(StubProvider::embedding(vec![1.0, 0.0]));
        let retriever = Retriever::new(provider, store, 5, 3);

        let err = retriever
            .retrieve(&Query {
                question: "anything".to_string(),
                product: None,
                top_k: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[tokio::test]
    async fn unmatched_filter_yields_empty_result() {
        let (store, _dir) = seeded_store().await;
        let provider = Arc::new(StubProvider::embedding(vec![1.0, 0.0, 0.0]));
        let retriever = Retriever::new(provider, store, 5, 3);

        let hits = retriever
            .retrieve(&Query {
                question: "anything".to_string(),
                product: Some("Mortgage".to_string()),
                top_k: None,
            })
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
