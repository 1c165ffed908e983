//! Embedding provider configuration.

use serde::{Deserialize, Serialize};

/// Configuration for an embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider name (e.g., "ollama", "mock")
    pub provider: String,

    /// Model identifier (e.g., "nomic-embed-text")
    pub model: String,

    /// Expected embedding dimensions; 0 disables the dimension check
    pub dimensions: usize,

    /// Provider endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: None,
        }
    }
}

impl From<&melos_core::config::EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &melos_core::config::EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            endpoint: settings.endpoint.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "nomic-embed-text");
        assert_eq!(config.dimensions, 768);
    }

    #[test]
    fn test_from_core_settings() {
        let settings = melos_core::config::EmbeddingSettings {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        };

        let config = EmbeddingConfig::from(&settings);
        assert_eq!(config.provider, "mock");
        assert_eq!(config.dimensions, 384);
    }
}
