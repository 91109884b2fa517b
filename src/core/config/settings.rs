use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application configuration, loaded from `config.yml` merged with
/// `secrets.yaml`. Unknown keys are ignored so older config files keep
/// working across releases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub prompt: PromptSettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Path to the complaint CSV export, relative to the project root
    /// unless absolute.
    pub complaints_csv: PathBuf,
    /// Product categories retained at ingestion. Rows outside this list are
    /// dropped before chunking.
    pub allowed_products: Vec<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            complaints_csv: PathBuf::from("data/complaints.csv"),
            allowed_products: vec![
                "Credit card".to_string(),
                "Personal loan".to_string(),
                "Buy Now, Pay Later".to_string(),
                "Savings account".to_string(),
                "Money transfer, virtual currency".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Model identifier passed to the embedding endpoint. Must match the
    /// model the index was built with.
    pub model: String,
    /// Expected vector dimension. Vectors of any other length are rejected.
    pub dimension: usize,
    /// Number of chunks embedded per request during index builds.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Default number of chunks returned per query.
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Character budget for retrieved context in the assembled prompt.
    pub max_context_chars: usize,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            max_context_chars: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider kind: "openai" for any OpenAI-compatible endpoint,
    /// "gemini" for the Google generative language API.
    pub provider: String,
    pub base_url: String,
    /// Kept in secrets.yaml, never in config.yml.
    pub api_key: Option<String>,
    pub chat_model: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "http://127.0.0.1:1234".to_string(),
            api_key: None,
            chat_model: "llama-3.1-8b-instruct".to_string(),
            request_timeout_secs: 60,
        }
    }
}
