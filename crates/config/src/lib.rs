//! Configuration loading, validation, and management for MoMo.
//!
//! Loads configuration from `~/.momo/config.toml` (or `$MOMO_HOME/config.toml`)
//! with environment variable overrides. Validates all settings at startup.

pub mod characters;

pub use characters::{CharacterBook, CharacterError, CharacterKind, DEFAULT_CHARACTER};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings that `/settings set` may change.
pub const SETTABLE_KEYS: &[&str] = &["base_url", "api_key", "model"];

/// Settings that `/settings` lists and `/settings del` may reset.
pub const LISTED_KEYS: &[&str] = &[
    "base_url",
    "api_key",
    "model",
    "character",
    "temperature",
    "max_tokens",
];

/// The root configuration structure.
///
/// Maps directly to `config.toml` in the data directory.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the chat endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Active character (persona)
    #[serde(default = "default_character")]
    pub character: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per reply (unset = provider default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Agent loop tuning
    #[serde(default)]
    pub agent: AgentConfig,

    /// Memory store tuning
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Keys whose current value came from the environment, not the file.
    #[serde(skip)]
    env_overrides: Vec<&'static str>,
}

/// Upper bound for `memory.half_life_days` (about a hundred years).
pub const MAX_HALF_LIFE_DAYS: f64 = 36_500.0;

pub const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";

fn default_model() -> String {
    "Qwen/Qwen3-8B".into()
}
fn default_character() -> String {
    DEFAULT_CHARACTER.into()
}
fn default_temperature() -> f32 {
    0.7
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("character", &self.character)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("memory", &self.memory)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Commands the model may run in a single turn before the turn is aborted
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,

    /// Hard timeout for one shell command
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Extra time the caller waits for a command beyond its timeout
    #[serde(default = "default_command_grace")]
    pub command_grace_secs: u64,

    /// How many memories go into the system message
    #[serde(default = "default_memory_top_k")]
    pub memory_top_k: usize,

    /// Importance added when the model reinforces a memory
    #[serde(default = "default_reinforce_boost")]
    pub reinforce_boost: f64,
}

fn default_max_tool_iterations() -> u32 {
    25
}
fn default_command_timeout() -> u64 {
    10
}
fn default_command_grace() -> u64 {
    5
}
fn default_memory_top_k() -> usize {
    32
}
fn default_reinforce_boost() -> f64 {
    0.5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            command_timeout_secs: default_command_timeout(),
            command_grace_secs: default_command_grace(),
            memory_top_k: default_memory_top_k(),
            reinforce_boost: default_reinforce_boost(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum number of stored memories
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Importance half-life
    #[serde(default = "default_half_life_days")]
    pub half_life_days: f64,

    /// Override for the memory file location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_capacity() -> usize {
    1000
}
fn default_half_life_days() -> f64 {
    7.0
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            half_life_days: default_half_life_days(),
            file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (`<data dir>/config.toml`).
    ///
    /// Environment variables fill in or override:
    /// - `MOMO_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `MOMO_BASE_URL`
    /// - `MOMO_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;

        if config.api_key.is_none() {
            if let Some(key) = std::env::var("MOMO_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            {
                config.api_key = Some(key);
                config.env_overrides.push("api_key");
            }
        }

        if let Ok(url) = std::env::var("MOMO_BASE_URL") {
            config.base_url = Some(url);
            config.env_overrides.push("base_url");
        }

        if let Ok(model) = std::env::var("MOMO_MODEL") {
            config.model = model;
            config.env_overrides.push("model");
        }

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

    /// Write the configuration back to disk.
    ///
    /// Values that came from environment variables are not persisted.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let mut persisted = self.clone();
        let file_state = Self::load_from(path).unwrap_or_default();
        for key in &self.env_overrides {
            match *key {
                "api_key" => persisted.api_key = file_state.api_key.clone(),
                "base_url" => persisted.base_url = file_state.base_url.clone(),
                "model" => persisted.model = file_state.model.clone(),
                _ => {}
            }
        }

        let content = toml::to_string_pretty(&persisted).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// The data directory: `$MOMO_HOME`, else `~/.momo`.
    pub fn data_dir() -> PathBuf {
        match std::env::var("MOMO_HOME") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => dirs_home().join(".momo"),
        }
    }

    pub fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    pub fn characters_path() -> PathBuf {
        Self::data_dir().join("characters.json")
    }

    /// Where the memory store lives.
    pub fn memory_path(&self) -> PathBuf {
        self.memory
            .file
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("memory.json"))
    }

    /// The endpoint to talk to.
    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_tool_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_iterations must be at least 1".into(),
            ));
        }

        if self.agent.command_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.command_timeout_secs must be at least 1".into(),
            ));
        }

        if self.memory.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "memory.capacity must be at least 1".into(),
            ));
        }

        let half_life = self.memory.half_life_days;
        if !half_life.is_finite() || half_life <= 0.0 || half_life > MAX_HALF_LIFE_DAYS {
            return Err(ConfigError::ValidationError(format!(
                "memory.half_life_days must be greater than 0 and at most {MAX_HALF_LIFE_DAYS}"
            )));
        }

        Ok(())
    }

    /// Current value of a listed setting, for display. The API key is redacted.
    pub fn setting(&self, key: &str) -> Option<String> {
        match key {
            "base_url" => Some(
                self.base_url
                    .clone()
                    .unwrap_or_else(|| format!("{DEFAULT_BASE_URL} (default)")),
            ),
            "api_key" => Some(match &self.api_key {
                Some(k) => mask_key(k),
                None => "(not set)".into(),
            }),
            "model" => Some(self.model.clone()),
            "character" => Some(self.character.clone()),
            "temperature" => Some(self.temperature.to_string()),
            "max_tokens" => Some(
                self.max_tokens
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "(provider default)".into()),
            ),
            _ => None,
        }
    }

    /// All listed settings in display order.
    pub fn settings_view(&self) -> Vec<(&'static str, String)> {
        LISTED_KEYS
            .iter()
            .filter_map(|key| self.setting(key).map(|value| (*key, value)))
            .collect()
    }

    /// Change one of [`SETTABLE_KEYS`].
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "base_url" => self.base_url = Some(value.trim_end_matches('/').to_string()),
            "api_key" => self.api_key = Some(value.to_string()),
            "model" => self.model = value.to_string(),
            _ => return Err(ConfigError::UnknownSetting(key.to_string())),
        }
        self.env_overrides.retain(|k| *k != key);
        Ok(())
    }

    /// Reset one of [`LISTED_KEYS`] to its default.
    pub fn unset_setting(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "base_url" => self.base_url = None,
            "api_key" => self.api_key = None,
            "model" => self.model = default_model(),
            "character" => self.character = default_character(),
            "temperature" => self.temperature = default_temperature(),
            "max_tokens" => self.max_tokens = None,
            _ => return Err(ConfigError::UnknownSetting(key.to_string())),
        }
        self.env_overrides.retain(|k| *k != key);
        Ok(())
    }

    /// Reset every listed setting. Agent and memory tuning are kept.
    pub fn reset_settings(&mut self) {
        *self = Self {
            agent: self.agent.clone(),
            memory: self.memory.clone(),
            ..Self::default()
        };
    }

    /// Render the effective configuration as TOML (API key redacted).
    pub fn to_display_toml(&self) -> String {
        let mut shown = self.clone();
        if let Some(key) = &shown.api_key {
            shown.api_key = Some(mask_key(key));
        }
        toml::to_string_pretty(&shown).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_model(),
            character: default_character(),
            temperature: default_temperature(),
            max_tokens: None,
            agent: AgentConfig::default(),
            memory: MemoryConfig::default(),
            env_overrides: Vec::new(),
        }
    }
}

/// Show the first four characters of a key.
fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}***")
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

    #[error("Failed to write {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),
}
