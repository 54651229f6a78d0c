//! The decision engine: one LLM round-trip turned into "pick an action".

use autoclaw_core::{
    ActionDefinition, ActionParams, Message, Observable, ParamSpec, Progress, ProviderError,
    ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition,
};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::agent::Agent;
use crate::control::Toolbox;
use crate::error::AgentError;
use crate::job::PendingAction;
use crate::prompts;

const REASONING_TOOL: &str = "reasoning";
const PICK_TOOL: &str = "pick_tool";
const NO_TOOL: &str = "none";

/// Outcome of a single successful decision.
#[derive(Debug, Clone)]
pub(crate) struct Decision {
    /// `None` when the model answered in free text.
    pub action_name: Option<String>,
    pub params: ActionParams,
    pub message: String,
    /// Extra tool calls in the response that were ignored.
    pub dropped_tool_calls: usize,
}

/// What `pick_action` settled on.
pub(crate) enum Pick {
    /// No tool: reply with `message` (composed when empty).
    Nothing { message: String },
    Action(PendingAction),
}

impl Agent {
    /// One decision with retries.
    ///
    /// Every tool in `tools` is offered; `forced` pins the model to one of
    /// them. Provider errors, unparseable arguments and a forced call that
    /// comes back with another tool all count as failed attempts.
    pub(crate) async fn decision(
        &self,
        parent: Option<&Observable>,
        token: &CancellationToken,
        conversation: &[Message],
        tools: Vec<ToolDefinition>,
        forced: Option<&str>,
    ) -> Result<Decision, AgentError> {
        let attempts = self.options.max_retries.max(1);
        let tool_names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        let mut obs = self.open_observable(
            parent,
            "decision",
            "brain",
            Some(serde_json::json!({ "tools": tool_names, "forced": forced })),
        );

        let mut last = String::new();
        for attempt in 1..=attempts {
            let mut request = ProviderRequest::new(self.options.model.clone(), conversation.to_vec());
            request.temperature = self.options.temperature;
            request.max_tokens = self.options.max_tokens;
            if !tools.is_empty() {
                request.tool_choice = Some(match forced {
                    Some(name) => ToolChoice::Function(name.to_string()),
                    None => ToolChoice::Auto,
                });
            }
            request.tools = tools.clone();

            let response = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    self.close_observable(obs, Some(AgentError::Expired.to_string()));
                    return Err(AgentError::Expired);
                }
                r = self.provider.complete(request) => r,
            };

            match response.and_then(|r| self.interpret(r, forced)) {
                Ok((decision, reply)) => {
                    debug!(
                        agent = %self.name,
                        attempt,
                        action = decision.action_name.as_deref().unwrap_or("-"),
                        "Decision made"
                    );
                    if let Some(o) = obs.as_mut() {
                        o.push_progress(Progress {
                            response: serde_json::to_value(&reply).ok(),
                            ..Default::default()
                        });
                    }
                    self.close_observable(obs, None);
                    self.log_exchange("decision", conversation, reply);
                    return Ok(decision);
                }
                Err(e) => {
                    warn!(agent = %self.name, attempt, error = %e, "Decision attempt failed");
                    if let Some(o) = obs.as_mut() {
                        o.push_progress(Progress::error(&e));
                        self.publish(o);
                    }
                    last = e.to_string();
                }
            }
        }

        self.close_observable(obs, Some(last.clone()));
        Err(AgentError::Decision { attempts, last })
    }

    fn interpret(
        &self,
        response: ProviderResponse,
        forced: Option<&str>,
    ) -> Result<(Decision, Message), ProviderError> {
        let message = response.message;
        let dropped_tool_calls = message.tool_calls.len().saturating_sub(1);
        if dropped_tool_calls > 0 {
            warn!(
                agent = %self.name,
                dropped = dropped_tool_calls,
                "Model returned several tool calls; only the first is used"
            );
        }

        let Some(call) = message.tool_calls.first() else {
            if let Some(tool) = forced {
                return Err(ProviderError::MalformedArguments {
                    tool: tool.to_string(),
                    reason: "no tool call in response".into(),
                });
            }
            let decision = Decision {
                action_name: None,
                params: ActionParams::new(),
                message: message.content.clone(),
                dropped_tool_calls,
            };
            return Ok((decision, message));
        };

        if let Some(tool) = forced
            && call.name != tool
        {
            return Err(ProviderError::MalformedArguments {
                tool: tool.to_string(),
                reason: format!("model called `{}` instead", call.name),
            });
        }

        let params = ActionParams::read(&call.arguments).map_err(|e| ProviderError::MalformedArguments {
            tool: call.name.clone(),
            reason: e.to_string(),
        })?;
        let decision = Decision {
            action_name: Some(call.name.clone()),
            params,
            message: message.content.clone(),
            dropped_tool_calls,
        };
        Ok((decision, message))
    }

    /// Choose the next action, appending `prompt` as a system instruction.
    ///
    /// With `force_reasoning` the model first writes its reasoning, then
    /// names a tool; parameters are left for [`Agent::generate_parameters`].
    pub(crate) async fn pick_action(
        &self,
        parent: Option<&Observable>,
        token: &CancellationToken,
        conversation: &[Message],
        toolbox: &Toolbox,
        prompt: String,
    ) -> Result<Pick, AgentError> {
        let mut conv = conversation.to_vec();
        conv.push(Message::system(prompt));

        if !self.options.force_reasoning {
            let decision = self.decision(parent, token, &conv, toolbox.tools(), None).await?;
            let Some(name) = decision.action_name else {
                return Ok(Pick::Nothing {
                    message: decision.message,
                });
            };
            let chosen = toolbox
                .resolve(&name)
                .ok_or(AgentError::UnknownAction(name))?;
            return Ok(Pick::Action(PendingAction {
                chosen,
                params: Some(decision.params),
                reasoning: decision.message,
            }));
        }

        let reasoning_tool = ActionDefinition::new(REASONING_TOOL, "Write down your reasoning.")
            .required_param(REASONING_TOOL, ParamSpec::string("Your step by step reasoning"));
        conv.push(Message::system(prompts::REASONING));
        let decision = self
            .decision(parent, token, &conv, vec![reasoning_tool.to_tool()], Some(REASONING_TOOL))
            .await?;
        let reasoning = decision
            .params
            .get_str(REASONING_TOOL)
            .unwrap_or_default()
            .to_string();

        let mut names = toolbox.names();
        names.push(NO_TOOL.to_string());
        let pick_tool = ActionDefinition::new(PICK_TOOL, "Pick the tool to use next.")
            .required_param("tool", ParamSpec::string("The tool to use").with_enum(names))
            .param("reasoning", ParamSpec::string("Why this tool"));
        conv.pop();
        conv.push(Message::system(prompts::pick_tool(&reasoning)));
        let decision = self
            .decision(parent, token, &conv, vec![pick_tool.to_tool()], Some(PICK_TOOL))
            .await?;

        let tool = decision.params.get_str("tool").unwrap_or(NO_TOOL);
        if tool.is_empty() || tool == NO_TOOL {
            return Ok(Pick::Nothing {
                message: String::new(),
            });
        }
        let chosen = toolbox
            .resolve(tool)
            .ok_or_else(|| AgentError::UnknownAction(tool.to_string()))?;
        Ok(Pick::Action(PendingAction {
            chosen,
            params: None,
            reasoning,
        }))
    }

    /// Force a call to `def` to obtain its arguments.
    pub(crate) async fn generate_parameters(
        &self,
        parent: Option<&Observable>,
        token: &CancellationToken,
        conversation: &[Message],
        def: &ActionDefinition,
        reasoning: &str,
    ) -> Result<ActionParams, AgentError> {
        let mut conv = conversation.to_vec();
        conv.push(Message::system(prompts::parameters(&def.name, reasoning)));
        match self
            .decision(parent, token, &conv, vec![def.to_tool()], Some(&def.name))
            .await
        {
            Ok(decision) => Ok(decision.params),
            Err(AgentError::Decision { attempts, last }) => Err(AgentError::ParameterGeneration {
                action: def.name.clone(),
                attempts,
                last,
            }),
            Err(e) => Err(e),
        }
    }

    /// Schema-constrained call decoded into `T`.
    pub(crate) async fn structured<T: DeserializeOwned>(
        &self,
        parent: Option<&Observable>,
        token: &CancellationToken,
        conversation: &[Message],
        tool: &str,
        schema: serde_json::Value,
        prompt: &str,
    ) -> Result<T, AgentError> {
        let def = ActionDefinition::new(tool, prompt).with_schema(schema);
        let mut conv = conversation.to_vec();
        conv.push(Message::system(prompt));
        let decision = self
            .decision(parent, token, &conv, vec![def.to_tool()], Some(tool))
            .await?;
        decision
            .params
            .unmarshal()
            .map_err(|e| AgentError::invalid_payload(tool, e))
    }

    /// Tool-less call writing the final answer. A non-empty `draft` is polished.
    pub(crate) async fn compose_reply(
        &self,
        parent: Option<&Observable>,
        token: &CancellationToken,
        conversation: &[Message],
        draft: &str,
    ) -> Result<String, AgentError> {
        let prompt = if draft.is_empty() {
            prompts::REPLY.to_string()
        } else {
            prompts::polish(draft)
        };
        let mut conv = conversation.to_vec();
        conv.push(Message::system(prompt));
        let decision = self.decision(parent, token, &conv, Vec::new(), None).await?;
        Ok(decision.message)
    }

    /// Describe an attached image with the multimodal model.
    pub(crate) async fn describe_image(
        &self,
        token: &CancellationToken,
        image: &str,
    ) -> Result<String, AgentError> {
        let model = self
            .options
            .multimodal_model
            .clone()
            .unwrap_or_else(|| self.options.model.clone());
        let mut request = ProviderRequest::new(
            model,
            vec![Message::user_with_image(prompts::DESCRIBE_IMAGE, image)],
        );
        request.max_tokens = self.options.max_tokens;

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(AgentError::Expired),
            r = self.provider.complete(request) => r,
        };
        response
            .map(|r| r.message.content)
            .map_err(|e| AgentError::Decision {
                attempts: 1,
                last: e.to_string(),
            })
    }

    fn log_exchange(&self, purpose: &str, conversation: &[Message], reply: Message) {
        let Some(log) = &self.log else {
            return;
        };
        let mut exchange = conversation.to_vec();
        exchange.push(reply);
        if let Err(e) = log.write(&self.name, purpose, &exchange) {
            warn!(agent = %self.name, "Failed to write conversation log: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentBuilder;
    use crate::control::{Chosen, ControlAction};
    use crate::options::AgentOptions;
    use crate::test_helpers::*;
    use autoclaw_core::{Action, ActionSet};
    use std::sync::Arc;

    async fn agent_with(provider: Arc<SequentialMockProvider>, options: AgentOptions) -> Arc<Agent> {
        AgentBuilder::new("tester", provider)
            .with_options(options)
            .build()
            .await
            .unwrap()
    }

    fn toolbox() -> Toolbox {
        let mut actions = ActionSet::new();
        actions.register(Arc::new(WeatherAction));
        Toolbox {
            actions,
            controls: vec![ControlAction::Reply],
        }
    }

    #[tokio::test]
    async fn free_text_is_no_action() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_text_response("hello"))]));
        let agent = agent_with(provider.clone(), AgentOptions::default()).await;

        let d = agent
            .decision(None, &CancellationToken::new(), &[Message::user("hi")], toolbox().tools(), None)
            .await
            .unwrap();
        assert!(d.action_name.is_none());
        assert_eq!(d.message, "hello");

        let req = &provider.requests()[0];
        assert_eq!(req.tool_choice, Some(ToolChoice::Auto));
        assert_eq!(req.tools.len(), 2);
    }

    #[tokio::test]
    async fn retries_until_exhausted() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Err(ProviderError::Network("down".into())),
            Err(ProviderError::Network("still down".into())),
            Err(ProviderError::Timeout("slow".into())),
        ]));
        let options = AgentOptions {
            max_retries: 3,
            ..Default::default()
        };
        let agent = agent_with(provider.clone(), options).await;

        let err = agent
            .decision(None, &CancellationToken::new(), &[Message::user("hi")], Vec::new(), None)
            .await
            .unwrap_err();
        match err {
            AgentError::Decision { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.contains("slow"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn malformed_arguments_are_retried() {
        let mut bad = make_tool_call("get_weather", serde_json::json!({}));
        bad.arguments = "{not json".into();
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(vec![bad], "")),
            Ok(make_tool_call_response(
                vec![make_tool_call("get_weather", serde_json::json!({"city": "boston"}))],
                "",
            )),
        ]));
        let agent = agent_with(provider.clone(), AgentOptions::default()).await;

        let d = agent
            .decision(None, &CancellationToken::new(), &[Message::user("weather?")], toolbox().tools(), None)
            .await
            .unwrap();
        assert_eq!(d.action_name.as_deref(), Some("get_weather"));
        assert_eq!(d.params.get_str("city"), Some("boston"));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn extra_tool_calls_are_counted_and_dropped() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_tool_call_response(
            vec![
                make_tool_call("get_weather", serde_json::json!({"city": "boston"})),
                make_tool_call("get_weather", serde_json::json!({"city": "paris"})),
                make_tool_call("reply", serde_json::json!({"message": "x"})),
            ],
            "",
        ))]));
        let agent = agent_with(provider, AgentOptions::default()).await;

        let d = agent
            .decision(None, &CancellationToken::new(), &[Message::user("weather?")], toolbox().tools(), None)
            .await
            .unwrap();
        assert_eq!(d.params.get_str("city"), Some("boston"));
        assert_eq!(d.dropped_tool_calls, 2);
    }

    #[tokio::test]
    async fn forced_call_with_wrong_tool_is_retried() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(
                vec![make_tool_call("reply", serde_json::json!({"message": "x"}))],
                "",
            )),
            Ok(make_tool_call_response(
                vec![make_tool_call("get_weather", serde_json::json!({"city": "rome"}))],
                "",
            )),
        ]));
        let agent = agent_with(provider.clone(), AgentOptions::default()).await;

        let d = agent
            .decision(
                None,
                &CancellationToken::new(),
                &[Message::user("weather?")],
                toolbox().tools(),
                Some("get_weather"),
            )
            .await
            .unwrap();
        assert_eq!(d.params.get_str("city"), Some("rome"));
        assert_eq!(
            provider.requests()[0].tool_choice,
            Some(ToolChoice::Function("get_weather".into()))
        );
    }

    #[tokio::test]
    async fn cancelled_token_expires_without_calling() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_text_response("late"))]));
        let agent = agent_with(provider.clone(), AgentOptions::default()).await;
        let token = CancellationToken::new();
        token.cancel();

        let err = agent
            .decision(None, &token, &[Message::user("hi")], Vec::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Expired));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_action_name_is_fatal() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_tool_call_response(
            vec![make_tool_call("launch_rockets", serde_json::json!({}))],
            "",
        ))]));
        let agent = agent_with(provider, AgentOptions::default()).await;

        let err = agent
            .pick_action(None, &CancellationToken::new(), &[Message::user("go")], &toolbox(), "pick".into())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::UnknownAction(name) if name == "launch_rockets"));
    }

    #[tokio::test]
    async fn forced_reasoning_picks_in_two_calls() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(
                vec![make_tool_call("reasoning", serde_json::json!({"reasoning": "need weather"}))],
                "",
            )),
            Ok(make_tool_call_response(
                vec![make_tool_call("pick_tool", serde_json::json!({"tool": "get_weather"}))],
                "",
            )),
        ]));
        let options = AgentOptions {
            force_reasoning: true,
            ..Default::default()
        };
        let agent = agent_with(provider.clone(), options).await;

        let pick = agent
            .pick_action(None, &CancellationToken::new(), &[Message::user("weather?")], &toolbox(), "pick".into())
            .await
            .unwrap();
        let Pick::Action(pending) = pick else {
            panic!("expected an action");
        };
        assert!(matches!(pending.chosen, Chosen::Action(_)));
        assert!(pending.params.is_none());
        assert_eq!(pending.reasoning, "need weather");

        let requests = provider.requests();
        assert_eq!(requests[0].tool_choice, Some(ToolChoice::Function("reasoning".into())));
        assert_eq!(requests[1].tool_choice, Some(ToolChoice::Function("pick_tool".into())));
        let allowed = &requests[1].tools[0].parameters["properties"]["tool"]["enum"];
        assert_eq!(allowed, &serde_json::json!(["get_weather", "reply", "none"]));
    }

    #[tokio::test]
    async fn parameter_generation_failure_names_the_action() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_text_response("no tool")),
            Ok(make_text_response("still no tool")),
        ]));
        let options = AgentOptions {
            max_retries: 2,
            ..Default::default()
        };
        let agent = agent_with(provider, options).await;

        let err = agent
            .generate_parameters(
                None,
                &CancellationToken::new(),
                &[Message::user("weather?")],
                &WeatherAction.definition(),
                "",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ParameterGeneration { action, attempts: 2, .. } if action == "get_weather"));
    }

    #[tokio::test]
    async fn decisions_are_logged_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_text_response("hello"))]));
        let agent = AgentBuilder::new("tester", provider)
            .with_conversation_log(crate::persistence::ConversationLog::new(dir.path()))
            .build()
            .await
            .unwrap();

        agent
            .decision(None, &CancellationToken::new(), &[Message::user("hi")], Vec::new(), None)
            .await
            .unwrap();
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}
