//! Retrieval-augmented answering over the complaint index.
//!
//! - `store` / `sqlite`: the persistent vector index
//! - `retriever`: question → nearest chunks
//! - `prompt`: retrieval result → generation payload
//! - `engine`: the full request lifecycle with graceful degradation

pub mod engine;
pub mod prompt;
pub mod retriever;
pub mod sqlite;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use engine::{Answer, AnswerEngine, AnswerSource, AnswerStream};
pub use retriever::Query;
pub use sqlite::SqliteVectorStore;
pub use store::{EmbeddingMeta, IndexedChunk, SearchHit, VectorStore};
