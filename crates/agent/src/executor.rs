//! Agent pool and the executor interface used by external schedulers.

use async_trait::async_trait;
use autoclaw_config::AppConfig;
use autoclaw_core::{Observer, Provider, RagDb};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::{Agent, AgentBuilder};
use crate::error::AgentError;
use crate::job::{Job, JobOutput, REMINDER_KEY};
use crate::options::AgentOptions;
use crate::persistence::{ConversationLog, FileStateStore, StateStore};

/// Runs a prompt on a named agent on behalf of a scheduler.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Submit `prompt` as a reminder job and wait for it, or for `cancel`.
    async fn execute(
        &self,
        cancel: CancellationToken,
        agent_name: &str,
        prompt: &str,
    ) -> Result<JobOutput, AgentError>;
}

/// Named registry of running agents.
#[derive(Default)]
pub struct AgentPool {
    agents: BTreeMap<String, Arc<Agent>>,
    handles: Mutex<Vec<JoinHandle<Result<(), AgentError>>>>,
}

impl AgentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every agent declared in the configuration.
    pub async fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        rag: Option<Arc<dyn RagDb>>,
        observer: Option<Arc<dyn Observer>>,
    ) -> Result<Self, AgentError> {
        let state_dir = config.state_path();
        let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new(&state_dir));
        let mut pool = Self::new();

        for agent_config in &config.agents {
            let actions = autoclaw_actions::catalog(&agent_config.actions, rag.clone())
                .map_err(|e| AgentError::Config(format!("agent `{}`: {e}", agent_config.name)))?;

            let mut builder = AgentBuilder::new(&agent_config.name, provider.clone())
                .with_options(AgentOptions::from_config(config, agent_config))
                .with_actions(actions)
                .with_state_store(store.clone());
            if let Some(rag) = &rag {
                builder = builder.with_knowledge(rag.clone());
            }
            if let Some(observer) = &observer {
                builder = builder.with_observer(observer.clone());
            }
            if let Some(character) = &agent_config.character {
                builder = builder.with_character(character.clone());
            }
            if agent_config.conversation_log {
                builder = builder.with_conversation_log(ConversationLog::new(state_dir.join("conversations")));
            }

            pool.add(builder.build().await?);
        }
        Ok(pool)
    }

    pub fn add(&mut self, agent: Arc<Agent>) {
        self.agents.insert(agent.name().to_string(), agent);
    }

    pub fn get(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Spawn the run loop of every agent.
    pub fn start_all(&self) {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        for agent in self.agents.values() {
            info!(agent = %agent.name(), "Starting agent");
            handles.push(tokio::spawn(agent.clone().run()));
        }
    }

    /// Stop every agent and wait for their run loops to exit.
    pub async fn stop_all(&self) {
        for agent in self.agents.values() {
            agent.stop();
        }
        let handles = std::mem::take(&mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            match handle.await {
                Ok(Ok(())) | Ok(Err(AgentError::Stopped)) => {}
                Ok(Err(e)) => warn!("Agent exited with error: {e}"),
                Err(e) => warn!("Agent task panicked: {e}"),
            }
        }
    }
}

#[async_trait]
impl AgentExecutor for AgentPool {
    async fn execute(
        &self,
        cancel: CancellationToken,
        agent_name: &str,
        prompt: &str,
    ) -> Result<JobOutput, AgentError> {
        let agent = self
            .get(agent_name)
            .ok_or_else(|| AgentError::UnknownAgent(agent_name.to_string()))?;
        let job = Job::new()
            .with_text(prompt)
            .with_metadata(REMINDER_KEY, true)
            .with_cancellation(cancel.child_token());

        let result = agent.enqueue(job).await;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Expired),
            out = result.wait_result() => Ok(out),
        }
    }
}
