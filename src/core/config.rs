//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::errors::{Result, TranslationError};

/// Environment prefix for overrides, e.g. `TRANSLATOR_MODEL`
pub const ENV_PREFIX: &str = "TRANSLATOR";

/// Configuration for translator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// API key, sent as both bearer token and `api-key` header
    pub api_key: String,
    /// Base URL; `/chat/completions` is appended
    pub api_endpoint: String,
    /// Appended as `api-version` query parameter when non-empty
    pub api_version: String,
    /// Deployment or model name; omitted from the body when empty
    pub model: String,
    /// Four-line file: endpoint, key, API version, model
    pub credentials_file: Option<PathBuf>,
    /// Completion token limit
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
    /// Nucleus sampling cutoff
    pub top_p: f64,
    /// Per-request timeout
    pub timeout_ms: u64,
    /// Attempts on rate-limit errors
    pub max_retries: u32,
    /// First backoff delay, doubled per retry
    pub retry_delay_ms: u64,
    /// Upper bound of the random delay added to each backoff
    pub retry_jitter_ms: u64,
    /// Backoff cap
    pub max_retry_delay_ms: u64,
    /// Languages named in the prompt as the source
    pub source_languages: String,
    /// Language to translate into
    pub target_language: String,
    /// Glossary JSON file
    pub glossary_path: Option<PathBuf>,
    /// Key of the glossary section to use
    pub glossary_section: String,
    /// Batching and pacing
    pub batch: BatchConfig,
}

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Units per request
    pub max_batch_size: usize,
    /// Sub-batch size tried after a fragment mismatch
    pub retry_batch_size: usize,
    /// Sub-batches never shrink below this
    pub retry_batch_floor: usize,
    /// Pause between windows is drawn from `delay_min_ms..=delay_max_ms`
    pub delay_min_ms: u64,
    /// Upper bound of the pause between windows
    pub delay_max_ms: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint: String::new(),
            api_version: String::new(),
            model: String::new(),
            credentials_file: None,
            max_tokens: 4096,
            temperature: 0.0,
            top_p: 0.1,
            timeout_ms: 120_000,
            max_retries: 20,
            retry_delay_ms: 2000,
            retry_jitter_ms: 1000,
            max_retry_delay_ms: 600_000,
            source_languages: "Japanese/Chinese".to_string(),
            target_language: "Korean".to_string(),
            glossary_path: None,
            glossary_section: "JP_TO_KR".to_string(),
            batch: BatchConfig::default(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            retry_batch_size: 5,
            retry_batch_floor: 3,
            delay_min_ms: 3000,
            delay_max_ms: 5000,
        }
    }
}

impl BatchConfig {
    /// Size of the sub-batches a mismatched batch of `len` units is cut into
    pub fn retry_size(&self, len: usize) -> usize {
        self.retry_batch_floor.max(self.retry_batch_size.min(len)).max(1)
    }
}

impl TranslatorConfig {
    /// Load defaults, then the optional file, then `TRANSLATOR_*` environment variables
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;

        if let Some(path) = config.credentials_file.clone() {
            config.apply_credentials_file(&path)?;
        }

        info!(
            "Configured model '{}' at {}",
            config.model,
            if config.api_endpoint.is_empty() { "<unset>" } else { config.api_endpoint.as_str() }
        );

        Ok(config)
    }

    /// Fill endpoint fields from a four-line credentials file
    pub fn apply_credentials_file(&mut self, path: &Path) -> Result<()> {
        let content =
            std::fs::read_to_string(path).map_err(|e| TranslationError::file(path, e))?;
        let lines: Vec<&str> = content.lines().map(str::trim).collect();

        if lines.len() < 2 {
            return Err(TranslationError::ConfigError {
                message: format!(
                    "credentials file {} needs at least endpoint and key lines",
                    path.display()
                ),
            });
        }

        let slots = [
            &mut self.api_endpoint,
            &mut self.api_key,
            &mut self.api_version,
            &mut self.model,
        ];
        for (slot, line) in slots.into_iter().zip(lines) {
            if !line.is_empty() {
                *slot = line.to_string();
            }
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| {
            Err(TranslationError::ConfigError {
                message: message.to_string(),
            })
        };

        if self.api_key.is_empty() {
            return fail("API key is required");
        }

        if self.api_endpoint.is_empty() {
            return fail("API endpoint is required");
        }

        if self.max_retries == 0 {
            return fail("max_retries must be greater than 0");
        }

        if self.batch.max_batch_size == 0 || self.batch.retry_batch_size == 0 {
            return fail("batch sizes must be greater than 0");
        }

        if self.batch.delay_min_ms > self.batch.delay_max_ms {
            return fail("batch.delay_min_ms must not exceed batch.delay_max_ms");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> TranslatorConfig {
        TranslatorConfig {
            api_key: "test_key".to_string(),
            api_endpoint: "https://test.com/models".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_config_validation_missing_key() {
        let config = TranslatorConfig {
            api_key: "".to_string(),
            ..valid()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_inverted_delay() {
        let mut config = valid();
        config.batch.delay_min_ms = 10;
        config.batch.delay_max_ms = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_size_respects_floor() {
        let batch = BatchConfig::default();
        assert_eq!(batch.retry_size(10), 5);
        assert_eq!(batch.retry_size(4), 4);
        assert_eq!(batch.retry_size(3), 3);
        assert_eq!(batch.retry_size(2), 3);
    }

    #[test]
    fn test_credentials_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "https://example.services.ai.azure.com/models").unwrap();
        writeln!(file, "secret").unwrap();
        writeln!(file, "2024-05-01-preview").unwrap();
        writeln!(file, "DeepSeek-R1").unwrap();

        let mut config = TranslatorConfig::default();
        config.apply_credentials_file(file.path()).unwrap();

        assert_eq!(config.api_endpoint, "https://example.services.ai.azure.com/models");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.api_version, "2024-05-01-preview");
        assert_eq!(config.model, "DeepSeek-R1");
    }

    #[test]
    fn test_credentials_file_too_short() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "https://only-endpoint").unwrap();

        let mut config = TranslatorConfig::default();
        assert!(config.apply_credentials_file(file.path()).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translator.json");
        std::fs::write(
            &path,
            r#"{"api_key": "k", "api_endpoint": "https://e", "batch": {"max_batch_size": 4}}"#,
        )
        .unwrap();

        let config = TranslatorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.batch.max_batch_size, 4);
        assert_eq!(config.batch.retry_batch_size, 5);
        assert_eq!(config.target_language, "Korean");
    }
}
