use std::sync::Arc;

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::llm::{build_provider, LlmProvider};
use crate::rag::{AnswerEngine, SqliteVectorStore, VectorStore};

pub mod error;

use error::InitializationError;

/// Application context shared across all routes.
///
/// Constructed once at startup; request handlers receive it instead of
/// reaching for process-wide globals. Holds:
/// - Paths and parsed configuration
/// - The vector index connection
/// - The llm provider (embeddings + generation)
/// - The answer engine wired from the above
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: AppConfig,
    pub store: Arc<dyn VectorStore>,
    pub provider: Arc<dyn LlmProvider>,
    pub engine: AnswerEngine,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// The embedding model stamped on the index must match the configured
    /// model and dimension; a mismatch aborts startup.
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config_service = ConfigService::new(paths.clone());
        let config = config_service
            .load_config()
            .map_err(InitializationError::Config)?;

        let store: Arc<dyn VectorStore> = Arc::new(
            SqliteVectorStore::new(paths.as_ref())
                .await
                .map_err(InitializationError::Store)?,
        );

        if let Some(meta) = store
            .embedding_meta()
            .await
            .map_err(InitializationError::Store)?
        {
            if meta.model != config.embedding.model {
                return Err(InitializationError::IndexMismatch(format!(
                    "index was built with embedding model '{}' but config requests '{}'; \
                     run the indexer to rebuild",
                    meta.model, config.embedding.model
                )));
            }
            if meta.dimension != config.embedding.dimension {
                return Err(InitializationError::IndexMismatch(format!(
                    "index was built with dimension {} but config requests {}; \
                     run the indexer to rebuild",
                    meta.dimension, config.embedding.dimension
                )));
            }
        } else {
            tracing::warn!("vector index is empty; run the indexer to build it");
        }

        let provider =
            build_provider(&config.llm, &config.embedding).map_err(InitializationError::Llm)?;

        let engine = AnswerEngine::new(provider.clone(), store.clone(), &config);

        Ok(Arc::new(AppState {
            paths,
            config,
            store,
            provider,
            engine,
        }))
    }
}
