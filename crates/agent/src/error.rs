//! Job-ending errors of the agent engine.

use autoclaw_core::MemoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("job expired or was cancelled")]
    Expired,

    #[error("agent is paused")]
    Paused,

    #[error("agent has been stopped")]
    Stopped,

    #[error("agent is already running")]
    AlreadyRunning,

    #[error("decision failed after {attempts} attempts: {last}")]
    Decision { attempts: u32, last: String },

    #[error("failed to generate parameters for {action} after {attempts} attempts: {last}")]
    ParameterGeneration {
        action: String,
        attempts: u32,
        last: String,
    },

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("invalid {what} payload: {source}")]
    InvalidPayload {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("planning failed: {0}")]
    Planning(String),

    #[error("turn limit of {0} reached")]
    TurnLimit(u32),

    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AgentError {
    pub(crate) fn invalid_payload(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidPayload {
            what: what.into(),
            source,
        }
    }
}
