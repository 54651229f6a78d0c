pub mod ask;
pub mod init;
pub mod run;
pub mod state;

use autoclaw_agent::AgentPool;
use autoclaw_config::{AppConfig, MemoryBackendKind};
use autoclaw_core::RagDb;
use autoclaw_memory::{FileKnowledge, InMemoryKnowledge};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    }
}

pub fn load_config(path: &Path) -> CliResult<AppConfig> {
    let config = AppConfig::load_with_env(path).map_err(|e| format!("Failed to load config: {e}"))?;
    if !config.has_api_key() {
        eprintln!("  warning: no API key configured (set AUTOCLAW_API_KEY or OPENAI_API_KEY)");
    }
    Ok(config)
}

/// The knowledge base shared by every agent, if one is configured.
pub fn knowledge(config: &AppConfig) -> Option<Arc<dyn RagDb>> {
    match config.memory.backend {
        MemoryBackendKind::None => None,
        MemoryBackendKind::InMemory => Some(Arc::new(InMemoryKnowledge::new())),
        MemoryBackendKind::File => Some(Arc::new(FileKnowledge::new(config.knowledge_path()))),
    }
}

pub async fn build_pool(config: &AppConfig) -> CliResult<AgentPool> {
    let provider = autoclaw_providers::build_from_config(config);
    let pool = AgentPool::from_config(config, provider, knowledge(config), None).await?;
    if pool.is_empty() {
        return Err("No agents configured. Run `autoclaw init` or add an [[agents]] section.".into());
    }
    Ok(pool)
}
