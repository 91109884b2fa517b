use thiserror::Error;

use crate::core::errors::ApiError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("failed to load configuration: {0}")]
    Config(ApiError),
    #[error("failed to open vector index: {0}")]
    Store(ApiError),
    #[error("failed to build llm provider: {0}")]
    Llm(ApiError),
    #[error("index/config mismatch: {0}")]
    IndexMismatch(String),
}
