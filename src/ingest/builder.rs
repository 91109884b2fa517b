//! Batch index build: complaints → chunks → embeddings → vector store.
//!
//! Rebuilds are an exclusive maintenance operation run by the indexer
//! binary, never by the serving process.

use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::chunker::Chunker;
use super::loader::ComplaintRecord;
use super::normalize::normalize_text;
use crate::core::config::AppConfig;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::rag::store::{IndexedChunk, VectorStore};

#[derive(Debug, Default, Clone, Serialize)]
pub struct BuildReport {
    pub complaints_indexed: usize,
    pub chunks_indexed: usize,
    /// Complaints whose narrative normalized to nothing.
    pub complaints_skipped_empty: usize,
}

pub struct IndexBuilder {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStore>,
    chunker: Chunker,
    embedding_model: String,
    embedding_dimension: usize,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
        config: &AppConfig,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            provider,
            store,
            chunker: Chunker::new(&config.chunking)?,
            embedding_model: config.embedding.model.clone(),
            embedding_dimension: config.embedding.dimension,
            batch_size: config.embedding.batch_size,
        })
    }

    /// Clears the store, stamps the embedding model, then indexes every
    /// record. Embedding vectors of the wrong dimension abort the build.
    pub async fn rebuild(&self, records: &[ComplaintRecord]) -> Result<BuildReport, ApiError> {
        self.store
            .rebuild(&self.embedding_model, self.embedding_dimension)
            .await?;

        let mut report = BuildReport::default();
        let mut pending: Vec<IndexedChunk> = Vec::new();

        for record in records {
            let normalized = normalize_text(&record.narrative);
            if normalized.is_empty() {
                report.complaints_skipped_empty += 1;
                continue;
            }

            for span in self.chunker.chunks(&normalized) {
                pending.push(IndexedChunk {
                    chunk_id: chunk_id(&record.id, span.index),
                    complaint_id: record.id.clone(),
                    product: record.product.clone(),
                    date_received: record.date_received,
                    chunk_index: span.index,
                    start_offset: span.start,
                    content: span.text.to_string(),
                });
            }
            report.complaints_indexed += 1;

            while pending.len() >= self.batch_size {
                let batch: Vec<IndexedChunk> = pending.drain(..self.batch_size).collect();
                report.chunks_indexed += self.flush(batch).await?;
            }
        }

        if !pending.is_empty() {
            report.chunks_indexed += self.flush(pending).await?;
        }

        tracing::info!(
            complaints = report.complaints_indexed,
            chunks = report.chunks_indexed,
            skipped_empty = report.complaints_skipped_empty,
            model = %self.embedding_model,
            "index rebuild finished"
        );

        Ok(report)
    }

    async fn flush(&self, batch: Vec<IndexedChunk>) -> Result<usize, ApiError> {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.provider.embed(&texts).await?;

        for embedding in &embeddings {
            if embedding.len() != self.embedding_dimension {
                return Err(ApiError::Config(format!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.embedding_dimension,
                    embedding.len()
                )));
            }
        }

        let count = batch.len();
        let items: Vec<(IndexedChunk, Vec<f32>)> =
            batch.into_iter().zip(embeddings.into_iter()).collect();
        self.store.upsert_batch(items).await?;

        tracing::debug!(chunks = count, "indexed batch");
        Ok(count)
    }
}

/// Identity-derived chunk id: re-indexing the same complaint overwrites its
/// previous chunks instead of duplicating them.
fn chunk_id(complaint_id: &str, chunk_index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(complaint_id.as_bytes());
    hasher.update(b":");
    hasher.update(chunk_index.to_string().as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::sqlite::SqliteVectorStore;
    use crate::rag::testutil::StubProvider;

    fn record(id: &str, product: &str, narrative: &str) -> ComplaintRecord {
        ComplaintRecord {
            id: id.to_string(),
            product: product.to_string(),
            narrative: narrative.to_string(),
            date_received: None,
        }
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.chunking.chunk_size = 20;
        config.chunking.chunk_overlap = 5;
        config.embedding.dimension = 3;
        config.embedding.batch_size = 2;
        config
    }

    async fn test_store() -> (Arc<SqliteVectorStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteVectorStore::with_path(dir.path().join("index.db"))
            .await
            .unwrap();
        (Arc::new(store), dir)
    }

    #[tokio::test]
    async fn rebuild_indexes_all_chunks() {
        let (store, _dir) = test_store().await;
        let provider = Arc::new(StubProvider::embedding(vec![1.0, 0.0, 0.0]));
        let builder = IndexBuilder::new(provider, store.clone(), &config()).unwrap();

        let records = vec![
            record("1001", "Credit card", "My card was charged twice for one purchase."),
            record("1002", "Personal loan", "Loan payoff misapplied to the wrong account."),
        ];

        let report = builder.rebuild(&records).await.unwrap();

        assert_eq!(report.complaints_indexed, 2);
        assert!(report.chunks_indexed > 2);
        assert_eq!(report.chunks_indexed, store.count().await.unwrap());

        let meta = store.embedding_meta().await.unwrap().unwrap();
        assert_eq!(meta.model, "all-MiniLM-L6-v2");
        assert_eq!(meta.dimension, 3);
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let (store, _dir) = test_store().await;
        let provider = Arc::new(StubProvider::embedding(vec![1.0, 0.0, 0.0]));
        let builder = IndexBuilder::new(provider, store.clone(), &config()).unwrap();

        let records = vec![record("1001", "Credit card", "Charged twice for one purchase.")];

        let first = builder.rebuild(&records).await.unwrap();
        let second = builder.rebuild(&records).await.unwrap();

        assert_eq!(first.chunks_indexed, second.chunks_indexed);
        assert_eq!(store.count().await.unwrap(), second.chunks_indexed);
    }

    #[tokio::test]
    async fn narrative_that_normalizes_to_nothing_is_skipped() {
        let (store, _dir) = test_store().await;
        let provider = Arc::new(StubProvider::embedding(vec![1.0, 0.0, 0.0]));
        let builder = IndexBuilder::new(provider, store.clone(), &config()).unwrap();

        let records = vec![record("1001", "Credit card", "###%%%@@@")];
        let report = builder.rebuild(&records).await.unwrap();

        assert_eq!(report.complaints_indexed, 0);
        assert_eq!(report.complaints_skipped_empty, 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn wrong_dimension_aborts_build() {
        let (store, _dir) = test_store().await;
        let provider = Arc::new(StubProvider::embedding(vec![1.0, 0.0]));
        let builder = IndexBuilder::new(provider, store, &config()).unwrap();

        let records = vec![record("1001", "Credit card", "Charged twice for one purchase.")];
        let err = builder.rebuild(&records).await.unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[tokio::test]
    async fn indexed_narrative_is_found_by_its_own_text() {
        let (store, _dir) = test_store().await;
        let provider = Arc::new(StubProvider::embedding(vec![0.2, 0.9, 0.1]));
        let builder = IndexBuilder::new(provider, store.clone(), &config()).unwrap();

        let records = vec![record(
            "1001",
            "Credit card",
            "My card was charged twice for the same purchase.",
        )];
        builder.rebuild(&records).await.unwrap();

        // Querying with the narrative's own embedding puts it on top.
        let hits = store.search(&[0.2, 0.9, 0.1], 3, None).await.unwrap();
        assert_eq!(hits[0].chunk.complaint_id, "1001");
        assert!(hits[0].score > 0.99);
    }

    #[test]
    fn chunk_ids_are_stable_and_distinct() {
        assert_eq!(chunk_id("1001", 0), chunk_id("1001", 0));
        assert_ne!(chunk_id("1001", 0), chunk_id("1001", 1));
        assert_ne!(chunk_id("1001", 0), chunk_id("1002", 0));
    }
}
