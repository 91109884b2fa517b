//! SQLite-backed vector store.
//!
//! Metadata lives in typed columns; embeddings are stored as little-endian
//! f32 BLOBs and compared with brute-force cosine similarity. At the scale
//! of a complaint corpus (tens of thousands of chunks) a linear scan per
//! query is well within budget.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{EmbeddingMeta, IndexedChunk, SearchHit, VectorStore};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteVectorStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.index_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS complaint_chunks (
                chunk_id TEXT PRIMARY KEY,
                complaint_id TEXT NOT NULL,
                product TEXT NOT NULL,
                date_received TEXT,
                chunk_index INTEGER NOT NULL,
                start_offset INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chunks_product ON complaint_chunks(product)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> IndexedChunk {
        let date_str: Option<String> = row.get("date_received");
        let chunk_index: i64 = row.get("chunk_index");
        let start_offset: i64 = row.get("start_offset");

        IndexedChunk {
            chunk_id: row.get("chunk_id"),
            complaint_id: row.get("complaint_id"),
            product: row.get("product"),
            date_received: date_str
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            chunk_index: chunk_index as usize,
            start_offset: start_offset as usize,
            content: row.get("content"),
        }
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT OR REPLACE INTO index_meta (key, value, updated_at)
             VALUES (?1, ?2, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<String>, ApiError> {
        sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert_batch(&self, items: Vec<(IndexedChunk, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let date_str = chunk.date_received.map(|d| d.format("%Y-%m-%d").to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO complaint_chunks
                    (chunk_id, complaint_id, product, date_received, chunk_index, start_offset, content, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.complaint_id)
            .bind(&chunk.product)
            .bind(&date_str)
            .bind(chunk.chunk_index as i64)
            .bind(chunk.start_offset as i64)
            .bind(&chunk.content)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        product: Option<&str>,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let rows = if let Some(product) = product {
            sqlx::query(
                "SELECT chunk_id, complaint_id, product, date_received, chunk_index, start_offset, content, embedding
                 FROM complaint_chunks
                 WHERE product = ?1",
            )
            .bind(product)
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?
        } else {
            sqlx::query(
                "SELECT chunk_id, complaint_id, product, date_received, chunk_index, start_offset, content, embedding
                 FROM complaint_chunks",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?
        };

        let mut scored: Vec<SearchHit> = rows
            .iter()
            .map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                let stored_emb = Self::deserialize_embedding(&embedding_bytes);
                SearchHit {
                    chunk: Self::row_to_chunk(row),
                    score: Self::cosine_similarity(query_embedding, &stored_emb),
                }
            })
            .collect();

        // Stable sort: ties keep store iteration order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM complaint_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count as usize)
    }

    async fn products(&self) -> Result<Vec<String>, ApiError> {
        sqlx::query_scalar("SELECT DISTINCT product FROM complaint_chunks ORDER BY product")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)
    }

    async fn rebuild(&self, embedding_model: &str, dimension: usize) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM complaint_chunks")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        self.set_meta("embedding_model", embedding_model).await?;
        self.set_meta("embedding_dimension", &dimension.to_string())
            .await?;

        Ok(())
    }

    async fn embedding_meta(&self) -> Result<Option<EmbeddingMeta>, ApiError> {
        let model = self.get_meta("embedding_model").await?;
        let dimension = self.get_meta("embedding_dimension").await?;

        match (model, dimension) {
            (Some(model), Some(dimension)) => {
                let dimension = dimension.parse::<usize>().map_err(|_| {
                    ApiError::Internal(format!(
                        "corrupt embedding_dimension stamp: '{}'",
                        dimension
                    ))
                })?;
                Ok(Some(EmbeddingMeta { model, dimension }))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (SqliteVectorStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteVectorStore::with_path(dir.path().join("index.db"))
            .await
            .unwrap();
        (store, dir)
    }

    fn make_chunk(id: &str, complaint_id: &str, product: &str, content: &str) -> IndexedChunk {
        IndexedChunk {
            chunk_id: id.to_string(),
            complaint_id: complaint_id.to_string(),
            product: product.to_string(),
            date_received: NaiveDate::from_ymd_opt(2023, 1, 5),
            chunk_index: 0,
            start_offset: 0,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_and_search_ranks_by_similarity() {
        let (store, _dir) = test_store().await;

        store
            .upsert_batch(vec![
                (
                    make_chunk("c1", "1001", "Credit card", "charged twice"),
                    vec![1.0, 0.0, 0.0],
                ),
                (
                    make_chunk("c2", "1002", "Credit card", "rate increase"),
                    vec![0.5, 0.5, 0.0],
                ),
                (
                    make_chunk("c3", "1003", "Savings account", "frozen funds"),
                    vec![0.0, 0.0, 1.0],
                ),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 10, None).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].chunk.chunk_id, "c1");
        assert!(hits[0].score > 0.99);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn search_respects_k_and_product_filter() {
        let (store, _dir) = test_store().await;

        store
            .upsert_batch(vec![
                (
                    make_chunk("c1", "1001", "Credit card", "charged twice"),
                    vec![1.0, 0.0],
                ),
                (
                    make_chunk("c2", "1002", "Credit card", "late fee"),
                    vec![0.9, 0.1],
                ),
                (
                    make_chunk("c3", "1003", "Credit card", "billing dispute"),
                    vec![0.8, 0.2],
                ),
                (
                    make_chunk("c4", "1004", "Personal loan", "payoff quote"),
                    vec![1.0, 0.0],
                ),
            ])
            .await
            .unwrap();

        let hits = store
            .search(&[1.0, 0.0], 3, Some("Credit card"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.chunk.product == "Credit card"));

        let capped = store.search(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[tokio::test]
    async fn empty_store_returns_empty_result() {
        let (store, _dir) = test_store().await;
        let hits = store.search(&[1.0, 0.0], 5, None).await.unwrap();
        assert!(hits.is_empty());

        let filtered = store.search(&[1.0, 0.0], 5, Some("Mortgage")).await.unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn upsert_overwrites_same_chunk_id() {
        let (store, _dir) = test_store().await;

        store
            .upsert_batch(vec![(
                make_chunk("c1", "1001", "Credit card", "first"),
                vec![1.0],
            )])
            .await
            .unwrap();
        store
            .upsert_batch(vec![(
                make_chunk("c1", "1001", "Credit card", "second"),
                vec![1.0],
            )])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.search(&[1.0], 1, None).await.unwrap();
        assert_eq!(hits[0].chunk.content, "second");
    }

    #[tokio::test]
    async fn rebuild_clears_rows_and_stamps_model() {
        let (store, _dir) = test_store().await;

        store
            .upsert_batch(vec![(
                make_chunk("c1", "1001", "Credit card", "data"),
                vec![1.0],
            )])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        store.rebuild("embed-v2", 384).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        let meta = store.embedding_meta().await.unwrap().unwrap();
        assert_eq!(meta.model, "embed-v2");
        assert_eq!(meta.dimension, 384);
    }

    #[tokio::test]
    async fn products_are_distinct_and_sorted() {
        let (store, _dir) = test_store().await;

        store
            .upsert_batch(vec![
                (
                    make_chunk("c1", "1001", "Personal loan", "a"),
                    vec![1.0],
                ),
                (make_chunk("c2", "1002", "Credit card", "b"), vec![1.0]),
                (make_chunk("c3", "1003", "Credit card", "c"), vec![1.0]),
            ])
            .await
            .unwrap();

        let products = store.products().await.unwrap();
        assert_eq!(products, vec!["Credit card", "Personal loan"]);
    }

    #[tokio::test]
    async fn roundtrips_date_and_offsets() {
        let (store, _dir) = test_store().await;

        let mut chunk = make_chunk("c1", "1001", "Credit card", "charged twice");
        chunk.chunk_index = 3;
        chunk.start_offset = 1350;
        store.upsert_batch(vec![(chunk, vec![1.0])]).await.unwrap();

        let hits = store.search(&[1.0], 1, None).await.unwrap();
        let stored = &hits[0].chunk;
        assert_eq!(stored.chunk_index, 3);
        assert_eq!(stored.start_offset, 1350);
        assert_eq!(stored.date_received, NaiveDate::from_ymd_opt(2023, 1, 5));
    }
}
