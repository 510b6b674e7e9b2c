//! Configuration
//!
//! Environment-driven with an optional YAML file underneath
//! (`~/.config/toolsched/config.yaml`). Precedence: defaults < file < env.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::Logger;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which LLM backend drives the model turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Ollama,
    OpenRouter,
}

impl LlmProvider {
    fn parse(value: &str) -> Self {
        match value {
            "openrouter" => LlmProvider::OpenRouter,
            _ => LlmProvider::Ollama,
        }
    }
}

/// LLM backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend kind
    pub provider: LlmProvider,
    /// Model name as the backend knows it
    pub model: String,
    /// API key (OpenRouter)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            model: "gpt-oss:latest".to_string(),
            api_key: None,
            api_base: None,
        }
    }
}

/// Full agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the ranking oracle
    pub scheduler_url: String,
    /// Tool-provider endpoints registered for every request
    pub provider_urls: Vec<String>,
    /// LLM backend settings
    pub llm: LlmConfig,
    /// Reasoning-step budget per request
    pub max_steps: usize,
    /// Oracle search result limit (None: oracle default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_limit: Option<usize>,
    /// Oracle search minimum score (None: oracle default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_score_threshold: Option<f64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            scheduler_url: "http://localhost:4000".to_string(),
            provider_urls: vec![
                "http://localhost:3005/mcp".to_string(),
                "http://localhost:3006/mcp".to_string(),
            ],
            llm: LlmConfig::default(),
            max_steps: 50,
            search_limit: None,
            search_score_threshold: None,
        }
    }
}

/// Partial configuration as it appears in the YAML file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    scheduler_url: Option<String>,
    provider_urls: Option<Vec<String>>,
    llm: Option<LlmConfig>,
    max_steps: Option<usize>,
    search_limit: Option<usize>,
    search_score_threshold: Option<f64>,
}

impl AgentConfig {
    /// Load configuration: defaults, then the user config file if present,
    /// then environment overrides
    pub fn load() -> Self {
        let mut config = Self::default();
        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                match Self::apply_file(&mut config, &path) {
                    Ok(()) => {}
                    Err(e) => eprintln!("[AgentConfig] Ignoring {}: {}", path.display(), e),
                }
            }
        }
        config.apply_env();
        config
    }

    /// Load from an explicit YAML file plus environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let mut config = Self::default();
        Self::apply_file(&mut config, path.as_ref())?;
        config.apply_env();
        Ok(config)
    }

    /// User-level config file location (~/.config/toolsched/config.yaml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("toolsched").join("config.yaml"))
    }

    fn apply_file(config: &mut Self, path: &Path) -> ConfigResult<()> {
        let raw = std::fs::read_to_string(path)?;
        let file: ConfigFile = serde_yaml::from_str(&raw)?;

        if let Some(url) = file.scheduler_url {
            config.scheduler_url = url;
        }
        if let Some(urls) = file.provider_urls {
            config.provider_urls = urls;
        }
        if let Some(llm) = file.llm {
            config.llm = llm;
        }
        if let Some(steps) = file.max_steps {
            config.max_steps = steps;
        }
        if file.search_limit.is_some() {
            config.search_limit = file.search_limit;
        }
        if file.search_score_threshold.is_some() {
            config.search_score_threshold = file.search_score_threshold;
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("SCHEDULER_URL") {
            self.scheduler_url = url;
        }
        if let Ok(urls) = std::env::var("MCP_SERVER_URLS") {
            let parsed: Vec<String> = urls
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                self.provider_urls = parsed;
            }
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = LlmProvider::parse(&provider);
        }
        match self.llm.provider {
            LlmProvider::Ollama => {
                if let Ok(model) = std::env::var("OLLAMA_MODEL") {
                    self.llm.model = model;
                }
            }
            LlmProvider::OpenRouter => {
                self.llm.model = std::env::var("OPENROUTER_MODEL")
                    .unwrap_or_else(|_| "google/gemini-2.0-flash-001".to_string());
            }
        }
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(steps) = std::env::var("MAX_STEPS") {
            if let Ok(parsed) = steps.parse() {
                self.max_steps = parsed;
            }
        }
    }

    /// Warn about configurations that cannot work as intended
    pub fn log_warnings(&self, logger: &dyn Logger) {
        if self.llm.provider == LlmProvider::OpenRouter && self.llm.api_key.is_none() {
            logger.warn(
                "[AgentConfig] LLM_PROVIDER is set to \"openrouter\" but OPENROUTER_API_KEY is not set",
            );
        }
    }
}
