//! # autoclaw core
//!
//! Domain types, traits, and error definitions for the autoclaw agent runtime.
//! This crate defines the boundary contracts (LLM provider, actions, knowledge
//! base, observer) that every other crate implements against.

pub mod action;
pub mod character;
pub mod error;
pub mod knowledge;
pub mod message;
pub mod observer;
pub mod provider;
pub mod state;

// Re-export key types at crate root for ergonomics
pub use action::{
    Action, ActionContext, ActionDefinition, ActionParams, ActionResult, ActionSet, ParamKind,
    ParamSpec,
};
pub use character::Character;
pub use error::{ActionError, Error, MemoryError, ProviderError, Result};
pub use knowledge::RagDb;
pub use message::{Message, MessageToolCall, Role};
pub use observer::{BroadcastObserver, Observable, Observer, Progress};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition, Usage};
pub use state::AgentInternalState;
