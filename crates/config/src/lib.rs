//! Configuration loading, validation, and management for vnchat.
//!
//! Two layers of configuration exist:
//!
//! - [`AppConfig`] — runtime settings loaded from `~/.vnchat/config.toml`
//!   with environment variable overrides (endpoint, key, documents dir).
//! - [`DirectorConfig`] — the per-story store populated from the `global`
//!   and `controls` JSON documents (delimiters, prompts, layout, model).

pub mod director;

pub use director::{DirectorConfig, MatchRule, ModelParams, PromptTemplates, StageLayout};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root runtime configuration.
///
/// Maps directly to `~/.vnchat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model endpoint. A key in the `global` document wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Directory holding `global.json`, `controls.json` and card documents
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    /// HTTP timeout for a single model call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum characters per dialogue page
    #[serde(default = "default_page_max_chars")]
    pub page_max_chars: usize,
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_documents_dir() -> PathBuf {
    PathBuf::from("game/AIconfig")
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_page_max_chars() -> usize {
    78
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("documents_dir", &self.documents_dir)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("page_max_chars", &self.page_max_chars)
            .finish()
    }
}

/// Redact a secret for Debug output.
pub(crate) fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.vnchat/config.toml).
    ///
    /// Also checks environment variables:
    /// - `VNCHAT_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `VNCHAT_DOCUMENTS_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given variable lookup.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("VNCHAT_API_KEY").or_else(|| lookup("OPENROUTER_API_KEY"));
        }
        if let Some(dir) = lookup("VNCHAT_DOCUMENTS_DIR") {
            self.documents_dir = PathBuf::from(dir);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".vnchat")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.page_max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "page_max_chars must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            documents_dir: default_documents_dir(),
            request_timeout_secs: default_request_timeout_secs(),
            page_max_chars: default_page_max_chars(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Malformed '{document}' document: {reason}")]
    InvalidDocument { document: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
