// Runtime configuration
//
// Credentials and ids come from the environment (a .env file is honored via
// dotenvy). The ConfigProvider trait is the seam for hosts with other
// credential sources (secret stores, interactive prompts); the env-backed
// implementation is the default.

use crate::error::{CoreError, Result};

/// Key/value source for credentials and ids
pub trait ConfigProvider {
    /// Look up a configuration value by key
    fn get(&self, key: &str) -> Option<String>;
}

/// ConfigProvider backed by process environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProvider;

impl ConfigProvider for EnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

/// Resolved configuration for one docchat instance
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for the remote conversation service
    pub openai_api_key: String,
    /// Credential for the OCR service
    pub ocr_api_key: String,
    /// Id of the remote assistant to run against
    pub assistant_id: String,
    /// Override for the conversation API base URL
    pub openai_base_url: Option<String>,
    /// Override for the OCR API base URL
    pub ocr_base_url: Option<String>,
}

impl Config {
    /// Load configuration from the environment (reads .env if present)
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_provider(&EnvProvider)
    }

    /// Load configuration from an arbitrary provider
    pub fn from_provider(provider: &dyn ConfigProvider) -> Result<Self> {
        let require = |key: &str| -> Result<String> {
            provider
                .get(key)
                .ok_or_else(|| CoreError::config(format!("{key} is not set")))
        };

        Ok(Self {
            openai_api_key: require("OPENAI_API_KEY")?,
            ocr_api_key: require("MISTRAL_API_KEY")?,
            assistant_id: require("ASSISTANT_ID")?,
            openai_base_url: provider.get("OPENAI_BASE_URL"),
            ocr_base_url: provider.get("MISTRAL_BASE_URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapProvider(HashMap<&'static str, &'static str>);

    impl ConfigProvider for MapProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    #[test]
    fn test_from_provider() {
        let provider = MapProvider(HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("MISTRAL_API_KEY", "mk-test"),
            ("ASSISTANT_ID", "asst_123"),
        ]));
        let config = Config::from_provider(&provider).unwrap();
        assert_eq!(config.assistant_id, "asst_123");
        assert!(config.ocr_base_url.is_none());
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let provider = MapProvider(HashMap::new());
        let err = Config::from_provider(&provider).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }
}
