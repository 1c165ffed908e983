//! Configuration management for the melos engines.
//!
//! This module handles loading and merging configuration from multiple
//! sources:
//! - Environment variables
//! - Config files (melos.yaml)
//!
//! Environment variables override values from the config file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Main application configuration.
///
/// Holds everything the query engine and vector store need to start:
/// where the exported library files live, where the vector snapshot is
/// persisted, and which embedding provider/model to use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory containing the exported library JSON files
    pub data_dir: PathBuf,

    /// Path for the vector store snapshot (None disables persistence)
    pub store_path: Option<PathBuf>,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Disable colored output
    pub no_color: bool,
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider name (e.g., "ollama", "mock")
    pub provider: String,

    /// Model identifier (e.g., "nomic-embed-text")
    pub model: String,

    /// Expected embedding dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Provider endpoint override
    pub endpoint: Option<String>,
}

fn default_dimensions() -> usize {
    768
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(), // Local-first default
            model: "nomic-embed-text".to_string(),
            dimensions: default_dimensions(),
            endpoint: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    data: Option<DataConfig>,
    store: Option<StoreConfig>,
    embedding: Option<EmbeddingSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DataConfig {
    dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            store_path: None,
            config_file: None,
            embedding: EmbeddingSettings::default(),
            log_level: None,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `MELOS_DATA_DIR`: Directory of exported library files
    /// - `MELOS_STORE_PATH`: Vector store snapshot path
    /// - `MELOS_CONFIG`: Path to config file
    /// - `MELOS_EMBED_PROVIDER`: Embedding provider name
    /// - `MELOS_EMBED_MODEL`: Embedding model identifier
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(config_file) = std::env::var("MELOS_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        // Load from YAML config file if it exists
        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("melos.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(data_dir) = std::env::var("MELOS_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(store_path) = std::env::var("MELOS_STORE_PATH") {
            config.store_path = Some(PathBuf::from(store_path));
        }

        if let Ok(provider) = std::env::var("MELOS_EMBED_PROVIDER") {
            config.embedding.provider = provider;
        }

        if let Ok(model) = std::env::var("MELOS_EMBED_MODEL") {
            config.embedding.model = model;
        }

        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(data) = config_file.data {
            if let Some(dir) = data.dir {
                result.data_dir = PathBuf::from(dir);
            }
        }

        if let Some(store) = config_file.store {
            if let Some(path) = store.path {
                result.store_path = Some(PathBuf::from(path));
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Validate configuration for the active embedding provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = &self.embedding.provider;
        let known_providers = ["ollama", "mock"];

        if !known_providers.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                provider,
                known_providers.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.embedding.dimensions, 768);
        assert!(config.store_path.is_none());
        assert!(!config.no_color);
    }

    #[test]
    fn test_validate_ollama() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.embedding.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_dimensions() {
        let mut config = AppConfig::default();
        config.embedding.dimensions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
data:
  dir: /music/export
store:
  path: /music/vectors.json
embedding:
  provider: mock
  model: trigram-v1
  dimensions: 384
logging:
  level: debug
  color: false
"#
        )
        .unwrap();

        let config = AppConfig::default()
            .merge_yaml(&file.path().to_path_buf())
            .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/music/export"));
        assert_eq!(config.store_path, Some(PathBuf::from("/music/vectors.json")));
        assert_eq!(config.embedding.provider, "mock");
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.log_level, Some("debug".to_string()));
        assert!(config.no_color);
    }

    #[test]
    fn test_merge_yaml_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "data: [not, a, mapping").unwrap();

        let result = AppConfig::default().merge_yaml(&file.path().to_path_buf());
        assert!(result.is_err());
    }
}
