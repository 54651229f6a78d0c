//! Per-agent engine options.

use autoclaw_config::{AgentConfig, AppConfig};
use std::time::Duration;

/// Behaviour switches and model settings for one agent.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub model: String,
    pub multimodal_model: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,

    pub system_prompt: Option<String>,
    pub permanent_goal: Option<String>,
    pub random_identity: bool,
    pub identity_guidance: Option<String>,

    /// Interval between autonomous runs. Zero disables them.
    pub periodic_runs: Duration,
    pub standalone_job: bool,
    pub initiate_conversations: bool,
    pub can_plan: bool,
    pub can_stop_itself: bool,
    pub enable_hud: bool,
    pub show_character: bool,
    pub force_reasoning: bool,

    pub enable_evaluation: bool,
    pub max_evaluation_loops: u32,

    /// Attempts per decision, including the first.
    pub max_retries: u32,
    /// Decision turns allowed per job.
    pub max_turns: u32,
    /// Identical calls tolerated before forcing a reply. Zero disables.
    pub loop_detection: usize,

    pub enable_kb: bool,
    pub kb_results: usize,
    pub long_term_memory: bool,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            multimodal_model: None,
            temperature: 0.7,
            max_tokens: None,
            system_prompt: None,
            permanent_goal: None,
            random_identity: false,
            identity_guidance: None,
            periodic_runs: Duration::from_secs(600),
            standalone_job: false,
            initiate_conversations: false,
            can_plan: false,
            can_stop_itself: false,
            enable_hud: false,
            show_character: false,
            force_reasoning: false,
            enable_evaluation: false,
            max_evaluation_loops: 2,
            max_retries: 5,
            max_turns: 25,
            loop_detection: 0,
            enable_kb: false,
            kb_results: 5,
            long_term_memory: false,
        }
    }
}

impl AgentOptions {
    pub fn from_config(app: &AppConfig, agent: &AgentConfig) -> Self {
        Self {
            model: app.model.clone(),
            multimodal_model: app.multimodal_model.clone(),
            temperature: app.temperature,
            max_tokens: Some(app.max_tokens),
            system_prompt: agent.system_prompt.clone(),
            permanent_goal: agent.permanent_goal.clone(),
            random_identity: agent.random_identity,
            identity_guidance: agent.identity_guidance.clone(),
            periodic_runs: Duration::from_secs(agent.periodic_runs_secs),
            standalone_job: agent.standalone_job,
            initiate_conversations: agent.initiate_conversations,
            can_plan: agent.can_plan,
            can_stop_itself: agent.can_stop_itself,
            enable_hud: agent.enable_hud,
            show_character: agent.show_character,
            force_reasoning: agent.force_reasoning,
            enable_evaluation: agent.enable_evaluation,
            max_evaluation_loops: agent.max_evaluation_loops,
            max_retries: agent.max_retries,
            max_turns: agent.max_turns,
            loop_detection: agent.loop_detection as usize,
            enable_kb: agent.enable_kb,
            kb_results: agent.kb_results,
            long_term_memory: agent.long_term_memory,
        }
    }

    /// Whether the run loop should fire autonomous jobs.
    pub fn autonomous(&self) -> bool {
        self.standalone_job && !self.periodic_runs.is_zero()
    }
}
