//! Configuration settings for Lexa.

use crate::retry::{Backoff, RetryPolicy, DEFAULT_COMPLETION_ATTEMPTS, DEFAULT_EMBEDDING_ATTEMPTS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAISettings,
    pub palm: PalmSettings,
    pub retry: RetrySettings,
    pub embedding: EmbeddingSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// OpenAI credentials and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
    pub api_base: String,
    /// Chat model used when the caller does not name one.
    pub model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl OpenAISettings {
    /// Resolve the API key from config, then the environment.
    pub fn resolve_api_key(&self) -> crate::error::Result<String> {
        resolve_key(self.api_key.as_deref(), "OPENAI_API_KEY", "openai.api_key")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// PaLM credentials and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PalmSettings {
    /// API key. Falls back to `PALM_API_KEY` when unset.
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
}

impl Default for PalmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://generativelanguage.googleapis.com/v1beta2".to_string(),
            model: "models/text-bison-001".to_string(),
            embedding_model: "models/embedding-gecko-001".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl PalmSettings {
    /// Resolve the API key from config, then the environment.
    pub fn resolve_api_key(&self) -> crate::error::Result<String> {
        resolve_key(self.api_key.as_deref(), "PALM_API_KEY", "palm.api_key")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Retry budget for single completion and generation calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub attempts: u32,
    pub min_wait_secs: u64,
    pub max_wait_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_COMPLETION_ATTEMPTS,
            min_wait_secs: 1,
            max_wait_secs: 60,
        }
    }
}

/// Batch embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Maximum embedding requests in flight at once.
    pub max_workers: usize,
    /// Attempts per text before the batch fails.
    pub retry_attempts: u32,
    pub min_wait_secs: u64,
    pub max_wait_secs: u64,
    /// Draw a progress bar while a batch runs.
    pub show_progress: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            max_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            retry_attempts: DEFAULT_EMBEDDING_ATTEMPTS,
            min_wait_secs: 1,
            max_wait_secs: 20,
            show_progress: true,
        }
    }
}

fn resolve_key(configured: Option<&str>, env_var: &str, key: &str) -> crate::error::Result<String> {
    configured
        .filter(|k| !k.trim().is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok().filter(|k| !k.trim().is_empty()))
        .ok_or_else(|| {
            crate::error::ApiError::Config(format!(
                "No API key: set {} in the config file or the {} environment variable",
                key, env_var
            ))
        })
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ApiError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexa")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Retry policy for completion and generation calls.
    pub fn completion_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.attempts,
            Backoff::new(
                Duration::from_secs(self.retry.min_wait_secs),
                Duration::from_secs(self.retry.max_wait_secs),
            ),
        )
    }

    /// Retry policy applied to each text of a batch embedding request.
    pub fn embedding_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.embedding.retry_attempts,
            Backoff::new(
                Duration::from_secs(self.embedding.min_wait_secs),
                Duration::from_secs(self.embedding.max_wait_secs),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.retry.attempts, 5);
        assert_eq!(settings.embedding.retry_attempts, 6);
        assert!(settings.embedding.max_workers >= 1);
        assert_eq!(settings.palm.model, "models/text-bison-001");

        let retry = settings.completion_retry();
        assert_eq!(retry.max_attempts(), 5);
        assert_eq!(retry.backoff().max(), Duration::from_secs(60));

        let retry = settings.embedding_retry();
        assert_eq!(retry.max_attempts(), 6);
        assert_eq!(retry.backoff().max(), Duration::from_secs(20));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[openai]\nmodel = \"gpt-4\"\n\n[embedding]\nmax_workers = 3\n",
        )
        .unwrap();

        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.openai.model, "gpt-4");
        assert_eq!(settings.openai.request_timeout_secs, 60);
        assert_eq!(settings.embedding.max_workers, 3);
        assert_eq!(settings.embedding.retry_attempts, 6);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.retry.max_wait_secs, 60);
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.palm.api_key = Some("palm-key".to_string());
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.palm.api_key.as_deref(), Some("palm-key"));
    }

    #[test]
    fn test_configured_key_wins() {
        let settings = OpenAISettings {
            api_key: Some("sk-configured".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.resolve_api_key().unwrap(), "sk-configured");
    }
}
