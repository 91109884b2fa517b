//! VectorStore trait — abstract interface for the complaint chunk index.
//!
//! The primary implementation is `SqliteVectorStore` in the `sqlite`
//! module. The index is rebuild-only: it is written by the indexer binary
//! during a maintenance run and read by every query afterwards.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A chunk persisted in the index, with its typed metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    /// Deterministic chunk identifier (derived from complaint id and
    /// chunk index, so re-indexing overwrites in place).
    pub chunk_id: String,
    pub complaint_id: String,
    pub product: String,
    pub date_received: Option<NaiveDate>,
    /// Position of this chunk within its complaint narrative.
    pub chunk_index: usize,
    /// Character offset of the chunk start in the normalized narrative.
    pub start_offset: usize,
    pub content: String,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: IndexedChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// Embedding build stamp. Queries against an index built with a different
/// model are meaningless, so the stamp is verified at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMeta {
    pub model: String,
    pub dimension: usize,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace chunks with their embedding vectors.
    async fn upsert_batch(&self, items: Vec<(IndexedChunk, Vec<f32>)>) -> Result<(), ApiError>;

    /// Return the `k` chunks most similar to the query embedding, scores
    /// descending, optionally restricted to one product. An empty index
    /// or an unmatched filter yields an empty vec, not an error.
    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        product: Option<&str>,
    ) -> Result<Vec<SearchHit>, ApiError>;

    /// Total number of indexed chunks.
    async fn count(&self) -> Result<usize, ApiError>;

    /// Distinct products present in the index, sorted.
    async fn products(&self) -> Result<Vec<String>, ApiError>;

    /// Clear all entries and stamp the embedding model for the new build.
    async fn rebuild(&self, embedding_model: &str, dimension: usize) -> Result<(), ApiError>;

    /// The stamp of the current build, if any build has run.
    async fn embedding_meta(&self) -> Result<Option<EmbeddingMeta>, ApiError>;
}
