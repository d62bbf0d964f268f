use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::extract::PageWindow;
use crate::core::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub llm: LlmConfig,
    pub finetune: FineTuneConfig,
    pub harvest: HarvestConfig,
}

/// Dataset preparation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory scanned for `*.pdf` source papers.
    pub input_dir: PathBuf,
    /// Output path for the line-delimited JSON dataset.
    pub output_file: PathBuf,
    /// Leading pages skipped per paper (title page).
    pub skip_pages: usize,
    /// Maximum pages read after the skipped ones.
    pub max_pages: usize,
    /// Delimiter between rendered reference records. Must not occur in
    /// titles or abstracts.
    pub record_delimiter: String,
}

/// Chat-completion service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API.
    pub endpoint: String,
    /// Model used for research-question derivation.
    pub model: String,
    /// Environment variable holding the API key. The key itself never
    /// lives in the config file.
    pub api_key_env: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt, in milliseconds.
    pub base_delay_ms: u64,
}

/// Fine-tuning submission configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FineTuneConfig {
    /// Base model to fine-tune.
    pub model: String,
}

/// Reference metadata harvesting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Base URL of the academic graph API.
    pub endpoint: String,
    /// Fixed delay between per-reference lookups, in milliseconds.
    /// This is the rate-limit gate for the metadata service.
    pub delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_file: PathBuf::from("fine_tune_data.jsonl"),
            skip_pages: 1,
            max_pages: 9,
            record_delimiter: "||".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 300,
            max_attempts: 3,
            base_delay_ms: 500,
        }
    }
}

impl Default for FineTuneConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.semanticscholar.org/graph/v1".to_string(),
            delay_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/paperforge/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, falling back to
    /// defaults if the file is missing or unparseable.
    pub fn load_from(config_path: &Path) -> Self {
        match std::fs::read_to_string(config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse config at {}: {e}, using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!(
                    "No config file at {}, using defaults",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("paperforge").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

impl PipelineConfig {
    pub fn page_window(&self) -> PageWindow {
        PageWindow {
            skip_pages: self.skip_pages,
            max_pages: self.max_pages,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.api_key_env)
            .map_err(|_| ConfigError::MissingApiKey(self.api_key_env.clone()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

impl HarvestConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
