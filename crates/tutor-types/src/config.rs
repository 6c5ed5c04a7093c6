//! Configuration loading for the tutor pipeline.
//!
//! Layered config: defaults -> config file -> CLI config file -> env vars.
//! CLI flags are applied by the caller after [`Settings::load`] returns.
//! Default config file: ~/.config/tutor-pipeline/config.toml

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TutorError;

const APP_NAME: &str = "tutor-pipeline";

/// Language-model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature; provider default when unset
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout_secs(),
            temperature: None,
        }
    }
}

impl LlmSettings {
    /// API key from settings, falling back to `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Semantic search service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Search endpoint URL (POST `{query, limit}`)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Passages requested per query
    #[serde(default = "default_search_limit")]
    pub limit: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_search_limit() -> usize {
    5
}

fn default_search_timeout_secs() -> u64 {
    30
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            limit: default_search_limit(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

impl SearchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Per-call retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Attempts per model call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts (ms)
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Per-query context summarization.
///
/// Disabled by default: retrieved passages reach the response stage verbatim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SummarizationMode {
    /// Pass retrieved passages through unchanged
    #[default]
    Disabled,
    /// Condense each query's passages with an extra model call
    Enabled,
}

/// Pipeline behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Generate/validate cycles in the response layer
    #[serde(default = "default_max_attempts")]
    pub max_response_attempts: u32,

    /// History messages embedded into prompts
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    /// Context summarization mode
    #[serde(default)]
    pub summarization: SummarizationMode,
}

fn default_history_turns() -> usize {
    10
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_response_attempts: default_max_attempts(),
            history_turns: default_history_turns(),
            summarization: SummarizationMode::default(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub pipeline: PipelineSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            llm: LlmSettings::default(),
            search: SearchSettings::default(),
            retry: RetrySettings::default(),
            pipeline: PipelineSettings::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/tutor-pipeline/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (TUTOR_*, `__` between nested keys)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TutorError> {
        let default_config_path = default_config_dir().join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| TutorError::Config(e.to_string()))?
            .set_default("llm.base_url", default_llm_base_url())
            .map_err(|e| TutorError::Config(e.to_string()))?
            .set_default("llm.model", default_llm_model())
            .map_err(|e| TutorError::Config(e.to_string()))?
            .set_default("retry.max_attempts", default_max_attempts() as i64)
            .map_err(|e| TutorError::Config(e.to_string()))?
            .set_default("retry.delay_ms", default_retry_delay_ms() as i64)
            .map_err(|e| TutorError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // TUTOR_LOG_LEVEL, TUTOR_LLM__MODEL, TUTOR_PIPELINE__SUMMARIZATION, ...
        builder = builder.add_source(
            Environment::with_prefix("TUTOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TutorError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TutorError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), TutorError> {
        if self.retry.max_attempts == 0 {
            return Err(TutorError::Config(
                "retry.max_attempts must be > 0".to_string(),
            ));
        }
        if self.pipeline.max_response_attempts == 0 {
            return Err(TutorError::Config(
                "pipeline.max_response_attempts must be > 0".to_string(),
            ));
        }
        if self.pipeline.history_turns == 0 {
            return Err(TutorError::Config(
                "pipeline.history_turns must be > 0".to_string(),
            ));
        }
        if self.search.limit == 0 {
            return Err(TutorError::Config("search.limit must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Directory holding the default config file.
pub fn default_config_dir() -> PathBuf {
    ProjectDirs::from("", "", APP_NAME)
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
