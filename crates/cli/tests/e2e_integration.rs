//! End-to-end integration tests for the autoclaw agent runtime.
//!
//! These tests build agents the way the CLI does (from an `AppConfig`),
//! start their run loops and drive them through the public job API with a
//! scripted provider standing in for the LLM.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use autoclaw_agent::{AgentExecutor, AgentPool, Job};
use autoclaw_config::{AgentConfig, AppConfig};
use autoclaw_core::error::ProviderError;
use autoclaw_core::message::{Message, MessageToolCall, Role};
use autoclaw_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use autoclaw_core::RagDb;
use autoclaw_memory::{FileKnowledge, InMemoryKnowledge};
use tokio_util::sync::CancellationToken;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: std::sync::Mutex<Vec<ProviderResponse>>,
    requests: std::sync::Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: std::sync::Mutex::new(responses),
            requests: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(ProviderError::ApiError {
                status_code: 500,
                message: format!("ScriptedProvider exhausted at call #{call}"),
            });
        }
        Ok(responses.remove(0))
    }
}

fn text_response(text: &str) -> ProviderResponse {
    tool_response(Vec::new(), text)
}

fn tool_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut msg = Message::assistant(thought);
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn call(name: &str, args: serde_json::Value) -> ProviderResponse {
    tool_response(vec![MessageToolCall::new(name, args.to_string())], "")
}

fn config_in(dir: &Path, agents: Vec<AgentConfig>) -> AppConfig {
    AppConfig {
        state_dir: Some(dir.to_string_lossy().to_string()),
        agents,
        ..AppConfig::default()
    }
}

// ── E2E: memory actions over a file knowledge base ───────────────────────

#[tokio::test]
async fn e2e_store_then_search_memory() {
    let dir = tempfile::tempdir().unwrap();
    let mut archivist = AgentConfig::named("archivist");
    archivist.actions = vec!["add_to_memory".into(), "search_memory".into()];
    let config = config_in(dir.path(), vec![archivist]);

    let rag: Arc<dyn RagDb> = Arc::new(FileKnowledge::new(dir.path().join("kb.jsonl")));
    let provider = ScriptedProvider::new(vec![
        call("add_to_memory", serde_json::json!({"content": "The launch code is 42"})),
        text_response("Saved it."),
        call("search_memory", serde_json::json!({"query": "launch code"})),
        text_response("The launch code is 42."),
    ]);
    let pool = AgentPool::from_config(&config, provider.clone(), Some(rag.clone()), None)
        .await
        .unwrap();
    pool.start_all();
    let agent = pool.get("archivist").unwrap();

    let first = agent.ask(Job::new().with_text("Remember the launch code is 42")).await;
    assert!(first.error.is_none(), "{:?}", first.error);
    assert_eq!(first.response, "Saved it.");
    assert_eq!(rag.count().await, 1);

    let second = agent.ask(Job::new().with_text("What is the launch code?")).await;
    assert!(second.error.is_none());
    assert_eq!(second.state.len(), 1);
    assert_eq!(second.state[0].current.action.name, "search_memory");
    assert!(second.state[0].result.result.contains("42"));
    assert_eq!(second.response, "The launch code is 42.");
    assert_eq!(provider.calls(), 4);

    pool.stop_all().await;
}

// ── E2E: internal state survives a restart ───────────────────────────────

#[tokio::test]
async fn e2e_state_persists_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut scout = AgentConfig::named("scout");
    scout.enable_hud = true;
    let config = config_in(dir.path(), vec![scout]);

    let provider = ScriptedProvider::new(vec![
        call(
            "update_state",
            serde_json::json!({
                "now_doing": "surveying",
                "do_next": "draw the map",
                "done_history": [],
                "memories": ["the river floods in spring"],
                "goal": "map the coast"
            }),
        ),
        text_response("State saved."),
    ]);
    let pool = AgentPool::from_config(&config, provider.clone(), None, None)
        .await
        .unwrap();
    pool.start_all();
    let out = pool
        .get("scout")
        .unwrap()
        .ask(Job::new().with_text("Set yourself a goal"))
        .await;
    assert!(out.error.is_none(), "{:?}", out.error);
    assert!(
        out.conversation
            .iter()
            .any(|m| m.role == Role::System && m.content.contains("map the coast"))
    );
    pool.stop_all().await;

    let restarted = AgentPool::from_config(&config, ScriptedProvider::new(vec![]), None, None)
        .await
        .unwrap();
    let state = restarted.get("scout").unwrap().current_state();
    assert_eq!(state.goal, "map the coast");
    assert_eq!(state.memories, vec!["the river floods in spring"]);
}

// ── E2E: the HUD reaches the model ───────────────────────────────────────

#[tokio::test]
async fn e2e_hud_and_system_prompt_in_first_request() {
    let dir = tempfile::tempdir().unwrap();
    let mut guide = AgentConfig::named("guide");
    guide.system_prompt = Some("You are a tour guide.".into());
    guide.permanent_goal = Some("show visitors the old town".into());
    guide.enable_hud = true;
    let config = config_in(dir.path(), vec![guide]);

    let provider = ScriptedProvider::new(vec![text_response("Welcome!")]);
    let pool = AgentPool::from_config(&config, provider.clone(), None, None)
        .await
        .unwrap();
    pool.start_all();
    let out = pool.get("guide").unwrap().ask(Job::new().with_text("hello")).await;
    assert_eq!(out.response, "Welcome!");

    let first = &provider.requests()[0];
    assert_eq!(first.messages[0].content, "You are a tour guide.");
    assert!(
        first
            .messages
            .iter()
            .any(|m| m.content.contains("This is your current state:"))
    );
    assert!(
        first
            .messages
            .iter()
            .any(|m| m.role == Role::User && m.content == "hello")
    );
    assert_eq!(first.messages.last().unwrap().role, Role::System);
    pool.stop_all().await;
}

// ── E2E: conversation logs and long-term memory ──────────────────────────

#[tokio::test]
async fn e2e_finished_jobs_are_logged_and_remembered() {
    let dir = tempfile::tempdir().unwrap();
    let mut keeper = AgentConfig::named("keeper");
    keeper.long_term_memory = true;
    let config = config_in(dir.path(), vec![keeper]);

    let rag = Arc::new(InMemoryKnowledge::new());
    let provider = ScriptedProvider::new(vec![text_response("Noted, the harbor opens at dawn.")]);
    let pool = AgentPool::from_config(&config, provider, Some(rag.clone()), None)
        .await
        .unwrap();
    pool.start_all();
    let out = pool
        .get("keeper")
        .unwrap()
        .ask(Job::new().with_text("The harbor opens at dawn"))
        .await;
    assert!(out.error.is_none());

    let logs: Vec<_> = std::fs::read_dir(dir.path().join("conversations"))
        .unwrap()
        .filter_map(Result::ok)
        .collect();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].file_name().to_string_lossy().starts_with("keeper-conversation-"));

    let mut hits = Vec::new();
    for _ in 0..50 {
        hits = rag.search("harbor", 3).await.unwrap();
        if !hits.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(hits.len(), 1);
    assert!(hits[0].contains("harbor opens at dawn"));
    pool.stop_all().await;
}

// ── E2E: executor interface ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_executor_runs_prompt_on_named_agent() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), vec![AgentConfig::named("butler")]);

    let provider = ScriptedProvider::new(vec![text_response("Plants watered.")]);
    let pool = AgentPool::from_config(&config, provider, None, None)
        .await
        .unwrap();
    pool.start_all();

    let executor: &dyn AgentExecutor = &pool;
    let out = executor
        .execute(CancellationToken::new(), "butler", "water the plants")
        .await
        .unwrap();
    assert_eq!(out.response, "Plants watered.");

    let missing = executor
        .execute(CancellationToken::new(), "nobody", "hello")
        .await;
    assert!(missing.is_err());
    pool.stop_all().await;
}

// ── E2E: stopped agents refuse work ──────────────────────────────────────

#[tokio::test]
async fn e2e_stop_all_rejects_new_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path(), vec![AgentConfig::named("sleeper")]);
    let pool = AgentPool::from_config(&config, ScriptedProvider::new(vec![]), None, None)
        .await
        .unwrap();
    pool.start_all();
    pool.stop_all().await;

    let agent = pool.get("sleeper").unwrap();
    assert!(agent.is_stopped());
    let out = agent.ask(Job::new().with_text("still there?")).await;
    assert!(out.error.is_some());
}
