//! Complaint ingestion pipeline: load, normalize, chunk, index.

pub mod builder;
pub mod chunker;
pub mod loader;
pub mod normalize;

pub use builder::{BuildReport, IndexBuilder};
pub use chunker::Chunker;
pub use loader::{ComplaintLoader, ComplaintRecord, LoadStats};
