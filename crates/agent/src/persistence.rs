//! Persistence of agent state, character and conversation logs.
//!
//! Everything is plain pretty-printed JSON on disk. Reads are forgiving:
//! a missing or corrupt file loads as `None` so an agent can always start.

use autoclaw_core::{AgentInternalState, Character, Message};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AgentError;

/// Storage for the agent's HUD and identity.
pub trait StateStore: Send + Sync {
    fn load_state(&self, agent: &str) -> Option<AgentInternalState>;
    fn save_state(&self, agent: &str, state: &AgentInternalState) -> Result<(), AgentError>;
    fn load_character(&self, agent: &str) -> Option<Character>;
    fn save_character(&self, agent: &str, character: &Character) -> Result<(), AgentError>;
}

/// `<dir>/<agent>.state.json` and `<dir>/<agent>.character.json`.
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn state_file(&self, agent: &str) -> PathBuf {
        self.dir.join(format!("{agent}.state.json"))
    }

    pub fn character_file(&self, agent: &str) -> PathBuf {
        self.dir.join(format!("{agent}.character.json"))
    }
}

impl StateStore for FileStateStore {
    fn load_state(&self, agent: &str) -> Option<AgentInternalState> {
        read_json(&self.state_file(agent))
    }

    fn save_state(&self, agent: &str, state: &AgentInternalState) -> Result<(), AgentError> {
        write_json(&self.state_file(agent), state)
    }

    fn load_character(&self, agent: &str) -> Option<Character> {
        read_json(&self.character_file(agent))
    }

    fn save_character(&self, agent: &str, character: &Character) -> Result<(), AgentError> {
        write_json(&self.character_file(agent), character)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), "Failed to read {e}");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(path = %path.display(), "Ignoring corrupt file: {e}");
            None
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AgentError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AgentError::Persistence(format!("{}: {e}", parent.display())))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AgentError::Persistence(e.to_string()))?;
    std::fs::write(path, json)
        .map_err(|e| AgentError::Persistence(format!("{}: {e}", path.display())))
}

/// Writes one JSON file per logged exchange.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    dir: PathBuf,
}

impl ConversationLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `conversation` to `<agent>-<purpose>-<timestamp>-<uuid>.json`.
    pub fn write(&self, agent: &str, purpose: &str, conversation: &[Message]) -> Result<PathBuf, AgentError> {
        let file = self.dir.join(format!(
            "{agent}-{purpose}-{}-{}.json",
            chrono::Utc::now().format("%Y%m%d%H%M%S"),
            Uuid::new_v4().simple()
        ));
        write_json(&file, &conversation)?;
        debug!(path = %file.display(), "Conversation logged");
        Ok(file)
    }
}
