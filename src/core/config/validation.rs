use super::settings::AppConfig;
use crate::core::errors::ApiError;

const KNOWN_PROVIDERS: [&str; 2] = ["openai", "gemini"];

pub fn validate_config(config: &AppConfig) -> Result<(), ApiError> {
    validate_range(
        "chunking.chunk_size",
        config.chunking.chunk_size,
        1,
        1_000_000,
    )?;
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        return Err(ApiError::Config(format!(
            "Invalid config at 'chunking.chunk_overlap': overlap ({}) must be smaller than chunk_size ({})",
            config.chunking.chunk_overlap, config.chunking.chunk_size
        )));
    }

    validate_range("embedding.dimension", config.embedding.dimension, 1, 65_536)?;
    validate_range("embedding.batch_size", config.embedding.batch_size, 1, 10_000)?;
    validate_nonempty("embedding.model", &config.embedding.model)?;

    validate_range("retrieval.top_k", config.retrieval.top_k, 1, 1_000)?;
    validate_range(
        "prompt.max_context_chars",
        config.prompt.max_context_chars,
        1,
        10_000_000,
    )?;

    validate_nonempty("llm.base_url", &config.llm.base_url)?;
    validate_nonempty("llm.chat_model", &config.llm.chat_model)?;
    if !KNOWN_PROVIDERS.contains(&config.llm.provider.as_str()) {
        return Err(ApiError::Config(format!(
            "Invalid config at 'llm.provider': unknown provider '{}' (expected one of {:?})",
            config.llm.provider, KNOWN_PROVIDERS
        )));
    }

    if config.data.allowed_products.iter().any(|p| p.trim().is_empty()) {
        return Err(ApiError::Config(
            "Invalid config at 'data.allowed_products': entries cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_range(path: &str, value: usize, min: usize, max: usize) -> Result<(), ApiError> {
    if value < min || value > max {
        return Err(ApiError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_nonempty(path: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Config(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let mut config = AppConfig::default();
        config.chunking.chunk_size = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ApiError::Config(_))
        ));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let mut config = AppConfig::default();
        config.chunking.chunk_size = 100;
        config.chunking.chunk_overlap = 100;
        assert!(validate_config(&config).is_err());

        config.chunking.chunk_overlap = 99;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_unknown_provider() {
        let mut config = AppConfig::default();
        config.llm.provider = "bedrock".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("llm.provider"));
    }

    #[test]
    fn rejects_zero_top_k() {
        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        assert!(validate_config(&config).is_err());
    }
}
