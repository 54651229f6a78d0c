//! Shared test helpers: a scripted provider and a few fixture actions.

use async_trait::async_trait;
use autoclaw_core::{
    Action, ActionContext, ActionDefinition, ActionError, ActionParams, ActionResult, Message,
    MessageToolCall, ParamSpec, Provider, ProviderError, ProviderRequest, ProviderResponse, Usage,
};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::job::REMINDER_KEY;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` pops the next response and records the request.
/// Once the script is exhausted every call fails with an API error.
pub struct SequentialMockProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::ApiError {
                    status_code: 500,
                    message: format!("SequentialMockProvider: no response scripted for call #{call}"),
                })
            })
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    make_tool_call_response(Vec::new(), text)
}

/// Create a response with tool calls and optional content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, content: &str) -> ProviderResponse {
    let mut msg = Message::assistant(content);
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall::new(name, args.to_string())
}

/// Scripted `extract_goal` answer.
pub fn goal_response(goal: &str) -> ProviderResponse {
    make_tool_call_response(
        vec![make_tool_call(
            "extract_goal",
            serde_json::json!({ "goal": goal, "constraints": [], "context": "" }),
        )],
        "",
    )
}

/// Scripted `evaluate_goal` answer.
pub fn evaluation_response(satisfied: bool, gaps: &[&str]) -> ProviderResponse {
    make_tool_call_response(
        vec![make_tool_call(
            "evaluate_goal",
            serde_json::json!({ "satisfied": satisfied, "gaps": gaps, "reasoning": "" }),
        )],
        "",
    )
}

/// `get_weather`: "30C" for boston, "unknown city" otherwise.
pub struct WeatherAction;

#[async_trait]
impl Action for WeatherAction {
    fn definition(&self) -> ActionDefinition {
        ActionDefinition::new("get_weather", "Get the current weather for a city")
            .required_param("city", ParamSpec::string("The city"))
    }

    async fn run(&self, _ctx: &ActionContext, params: ActionParams) -> Result<ActionResult, ActionError> {
        let city = params.get_str("city").unwrap_or_default().to_lowercase();
        if city.contains("boston") {
            Ok(ActionResult::text("30C"))
        } else {
            Ok(ActionResult::text("unknown city"))
        }
    }
}

/// `flaky_service`: always fails.
pub struct FailingAction;

#[async_trait]
impl Action for FailingAction {
    fn definition(&self) -> ActionDefinition {
        ActionDefinition::new("flaky_service", "Calls a service that is down")
    }

    async fn run(&self, _ctx: &ActionContext, _params: ActionParams) -> Result<ActionResult, ActionError> {
        Err(ActionError::ExecutionFailed {
            action: "flaky_service".into(),
            reason: "service unavailable".into(),
        })
    }
}

/// `secret`: not allowed in plans.
pub struct SecretAction;

#[async_trait]
impl Action for SecretAction {
    fn definition(&self) -> ActionDefinition {
        ActionDefinition::new("secret", "Only callable directly")
    }

    async fn run(&self, _ctx: &ActionContext, _params: ActionParams) -> Result<ActionResult, ActionError> {
        Ok(ActionResult::text("classified"))
    }

    fn plannable(&self) -> bool {
        false
    }
}

/// `check_metadata`: reports whether the job is a reminder.
pub struct MetadataAction;

#[async_trait]
impl Action for MetadataAction {
    fn definition(&self) -> ActionDefinition {
        ActionDefinition::new("check_metadata", "Reports job metadata")
    }

    async fn run(&self, ctx: &ActionContext, _params: ActionParams) -> Result<ActionResult, ActionError> {
        let reminder = ctx
            .metadata
            .get(REMINDER_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Ok(ActionResult::text(if reminder { "reminder" } else { "regular" }))
    }
}

/// `record`: logs start and end of each run, yielding in between.
#[derive(Default)]
pub struct RecordingAction {
    events: Mutex<Vec<String>>,
}

impl RecordingAction {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Action for RecordingAction {
    fn definition(&self) -> ActionDefinition {
        ActionDefinition::new("record", "Records its invocation")
            .required_param("tag", ParamSpec::string("A tag"))
    }

    async fn run(&self, _ctx: &ActionContext, params: ActionParams) -> Result<ActionResult, ActionError> {
        let tag = params.get_str("tag").unwrap_or_default().to_string();
        self.events.lock().unwrap().push(format!("start {tag}"));
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.events.lock().unwrap().push(format!("end {tag}"));
        Ok(ActionResult::text(tag))
    }
}

/// `slow_task`: sleeps for a fixed duration before answering "slept".
pub struct SlowAction {
    pub duration: std::time::Duration,
}

#[async_trait]
impl Action for SlowAction {
    fn definition(&self) -> ActionDefinition {
        ActionDefinition::new("slow_task", "Takes a while to finish")
    }

    async fn run(&self, _ctx: &ActionContext, _params: ActionParams) -> Result<ActionResult, ActionError> {
        tokio::time::sleep(self.duration).await;
        Ok(ActionResult::text("slept"))
    }
}
