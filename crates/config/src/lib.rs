//! Configuration loading, validation, and management for autoclaw.
//!
//! Loads configuration from `~/.autoclaw/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use autoclaw_core::Character;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.autoclaw/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the chat-completions endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used for decisions
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used to describe images (falls back to `model`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multimodal_model: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Where agent state, characters and conversation logs are written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<String>,

    /// Knowledge base configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Agent definitions
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_true() -> bool {
    true
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
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("multimodal_model", &self.multimodal_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("state_dir", &self.state_dir)
            .field("memory", &self.memory)
            .field("agents", &self.agents)
            .finish()
    }
}

/// Which knowledge-base backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackendKind {
    #[default]
    None,
    InMemory,
    File,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: MemoryBackendKind,

    /// JSONL file for the `file` backend (defaults to `<config dir>/knowledge.jsonl`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// One `[[agents]]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Long-lived goal shown in the HUD and used by autonomous runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_goal: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<Character>,

    /// Generate a character with the model when none is persisted
    #[serde(default)]
    pub random_identity: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_guidance: Option<String>,

    /// Catalog action names to enable
    #[serde(default)]
    pub actions: Vec<String>,

    /// Seconds between autonomous runs; 0 disables them
    #[serde(default = "default_periodic_runs")]
    pub periodic_runs_secs: u64,

    #[serde(default)]
    pub standalone_job: bool,

    #[serde(default)]
    pub initiate_conversations: bool,

    #[serde(default)]
    pub can_plan: bool,

    #[serde(default)]
    pub can_stop_itself: bool,

    #[serde(default)]
    pub enable_hud: bool,

    #[serde(default)]
    pub show_character: bool,

    #[serde(default)]
    pub force_reasoning: bool,

    #[serde(default)]
    pub enable_evaluation: bool,

    #[serde(default = "default_max_evaluation_loops")]
    pub max_evaluation_loops: u32,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Repeat count after which an identical action triggers a reply; 0 disables
    #[serde(default)]
    pub loop_detection: u32,

    #[serde(default)]
    pub enable_kb: bool,

    #[serde(default = "default_kb_results")]
    pub kb_results: usize,

    #[serde(default)]
    pub long_term_memory: bool,

    #[serde(default = "default_true")]
    pub conversation_log: bool,
}

fn default_periodic_runs() -> u64 {
    600
}
fn default_max_evaluation_loops() -> u32 {
    2
}
fn default_max_retries() -> u32 {
    5
}
fn default_max_turns() -> u32 {
    25
}
fn default_kb_results() -> usize {
    5
}

impl AgentConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: None,
            permanent_goal: None,
            character: None,
            random_identity: false,
            identity_guidance: None,
            actions: Vec::new(),
            periodic_runs_secs: default_periodic_runs(),
            standalone_job: false,
            initiate_conversations: false,
            can_plan: false,
            can_stop_itself: false,
            enable_hud: false,
            show_character: false,
            force_reasoning: false,
            enable_evaluation: false,
            max_evaluation_loops: default_max_evaluation_loops(),
            max_retries: default_max_retries(),
            max_turns: default_max_turns(),
            loop_detection: 0,
            enable_kb: false,
            kb_results: default_kb_results(),
            long_term_memory: false,
            conversation_log: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.autoclaw/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load a file, then apply environment overrides:
    /// - `AUTOCLAW_API_KEY`, then `OPENAI_API_KEY` (only if the file has no key)
    /// - `AUTOCLAW_API_URL`
    /// - `AUTOCLAW_MODEL`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("AUTOCLAW_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(url) = lookup("AUTOCLAW_API_URL") {
            self.api_url = url;
        }
        if let Some(model) = lookup("AUTOCLAW_MODEL") {
            self.model = model;
        }
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

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".autoclaw")
    }

    /// Directory for persisted agent state.
    pub fn state_path(&self) -> PathBuf {
        match &self.state_dir {
            Some(dir) => PathBuf::from(dir),
            None => Self::config_dir().join("state"),
        }
    }

    /// JSONL file backing the `file` knowledge base.
    pub fn knowledge_path(&self) -> PathBuf {
        match &self.memory.path {
            Some(p) => PathBuf::from(p),
            None => Self::config_dir().join("knowledge.jsonl"),
        }
    }

    pub fn agent(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                return Err(ConfigError::ValidationError("agent name must not be empty".into()));
            }
            if !seen.insert(agent.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate agent name '{}'",
                    agent.name
                )));
            }
            if agent.max_retries == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "agent '{}': max_retries must be >= 1",
                    agent.name
                )));
            }
            if agent.max_turns == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "agent '{}': max_turns must be >= 1",
                    agent.name
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let mut config = Self::default();
        let mut agent = AgentConfig::named("assistant");
        agent.system_prompt = Some("You are a helpful assistant.".into());
        agent.actions = vec!["search_memory".into(), "fetch_url".into()];
        agent.can_plan = true;
        config.agents.push(agent);
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            multimodal_model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            state_dir: None,
            memory: MemoryConfig::default(),
            agents: Vec::new(),
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

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.memory.backend, MemoryBackendKind::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_toml_roundtrips_with_example_agent() {
        let toml_str = AppConfig::default_toml();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert!(parsed.validate().is_ok());
        let agent = parsed.agent("assistant").unwrap();
        assert!(agent.can_plan);
        assert_eq!(agent.max_turns, 25);
        assert_eq!(agent.actions, vec!["search_memory", "fetch_url"]);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_agent_names_rejected() {
        let config = AppConfig {
            agents: vec![AgentConfig::named("a"), AgentConfig::named("a")],
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn zero_retries_rejected() {
        let mut agent = AgentConfig::named("a");
        agent.max_retries = 0;
        let config = AppConfig {
            agents: vec![agent],
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(config.agents.is_empty());
    }

    #[test]
    fn agents_section_parsing() {
        let toml_str = r#"
model = "qwen"
temperature = 0.2

[memory]
backend = "file"
path = "/tmp/kb.jsonl"

[[agents]]
name = "scout"
enable_hud = true
can_stop_itself = true
periodic_runs_secs = 30
standalone_job = true
actions = ["fetch_url"]

[agents.character]
name = "Scout"
hobbies = ["maps"]

[[agents]]
name = "plain"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.memory.backend, MemoryBackendKind::File);
        assert_eq!(config.knowledge_path(), PathBuf::from("/tmp/kb.jsonl"));
        let scout = config.agent("scout").unwrap();
        assert!(scout.enable_hud && scout.standalone_job);
        assert_eq!(scout.periodic_runs_secs, 30);
        assert_eq!(scout.character.as_ref().unwrap().hobbies, vec!["maps"]);
        let plain = config.agent("plain").unwrap();
        assert_eq!(plain.max_retries, 5);
        assert!(plain.conversation_log);
    }

    #[test]
    fn invalid_toml_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [unterminated").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-openai"),
            ("AUTOCLAW_MODEL", "llama3"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(config.model, "llama3");
        assert_eq!(config.api_url, default_api_url());
    }

    #[test]
    fn file_key_wins_over_env() {
        let mut config = AppConfig {
            api_key: Some("sk-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(|k| (k == "AUTOCLAW_API_KEY").then(|| "sk-env".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
