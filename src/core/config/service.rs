use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

/// Loads and merges the layered YAML configuration.
///
/// `config.yml` holds the public settings; `secrets.yaml` overlays values
/// that must not be committed (API keys). The merged document is
/// deserialized into [`AppConfig`] and range-validated.
#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("CREDITRUST_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    pub fn load_config(&self) -> Result<AppConfig, ApiError> {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        let merged = deep_merge(&public_config, &secrets_config);

        let config: AppConfig = serde_yaml::from_value(merged)
            .map_err(|e| ApiError::Config(format!("Failed to parse config: {}", e)))?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Resolves a configured data path against the project root.
    pub fn resolve_data_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.paths.project_root.join(path)
        }
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Mapping(Mapping::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Mapping(_)) => value,
            Ok(_) => {
                tracing::warn!("Config file {} is not a mapping; ignoring", path.display());
                Value::Mapping(Mapping::new())
            }
            Err(err) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), err);
                Value::Mapping(Mapping::new())
            }
        },
        Err(err) => {
            tracing::warn!("Failed to read {}: {}", path.display(), err);
            Value::Mapping(Mapping::new())
        }
    }
}

fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let merged_value = match merged.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Mapping(merged)
        }
        _ => overlay.clone(),
    }
}
