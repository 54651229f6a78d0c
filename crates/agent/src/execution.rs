//! Running chosen actions and folding results into the conversation.

use autoclaw_core::{
    Action, ActionContext, ActionError, ActionParams, ActionResult, AgentInternalState, Message,
    MessageToolCall, Observable, Progress,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::Agent;
use crate::control::{self, ControlAction, NewConversationPayload};
use crate::error::AgentError;
use crate::job::Job;
use crate::prompts;

/// Append the call and its result the way the model would have produced them.
pub(crate) fn fold_action(
    conversation: &mut Vec<Message>,
    name: &str,
    params: &ActionParams,
    result: &str,
) {
    let call = MessageToolCall::new(name, params.to_string());
    let id = call.id.clone();
    conversation.push(Message::assistant_tool_call(call));
    conversation.push(Message::tool_result(id, result));
}

impl Agent {
    /// Run an ordinary action. Its errors become result text; only
    /// cancellation ends the job.
    pub(crate) async fn run_action(
        &self,
        job: &Job,
        token: &CancellationToken,
        action: &Arc<dyn Action>,
        params: ActionParams,
        parent: Option<&Observable>,
    ) -> Result<ActionResult, AgentError> {
        let name = action.definition().name;
        let mut obs = self.open_observable(
            parent,
            &format!("action: {name}"),
            "gear",
            Some(serde_json::Value::Object(params.0.clone())),
        );
        let ctx = ActionContext {
            cancel: token.clone(),
            metadata: job.metadata.clone(),
        };

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => {
                self.close_observable(obs, Some(AgentError::Expired.to_string()));
                return Err(AgentError::Expired);
            }
            r = action.run(&ctx, params) => r,
        };

        let result = match outcome {
            Ok(result) => result,
            Err(ActionError::Cancelled(_)) if token.is_cancelled() => {
                self.close_observable(obs, Some(AgentError::Expired.to_string()));
                return Err(AgentError::Expired);
            }
            Err(e) => {
                warn!(agent = %self.name, job_id = %job.uuid, action = %name, "Action failed: {e}");
                ActionResult::text(format!("Error running tool: {e}"))
            }
        };

        if let Some(o) = obs.as_mut() {
            o.push_progress(Progress {
                action_result: Some(result.result.clone()),
                ..Default::default()
            });
        }
        self.close_observable(obs, None);
        Ok(result)
    }

    /// Replace the HUD and persist it. The only writer of the internal state.
    pub(crate) fn update_state(
        &self,
        conversation: &mut Vec<Message>,
        params: &ActionParams,
    ) -> Result<ActionResult, AgentError> {
        let state: AgentInternalState = control::payload(ControlAction::State, params)?;
        self.lock().current_state = state.clone();

        if let Some(store) = &self.store
            && let Err(e) = store.save_state(&self.name, &state)
        {
            warn!(agent = %self.name, "Failed to persist internal state: {e}");
        }
        info!(agent = %self.name, goal = %state.goal, "Internal state updated");

        conversation.push(Message::system(prompts::state_updated(&state)));
        Ok(ActionResult::text("State updated"))
    }

    /// Hand a new conversation to the subscriber fan-out.
    pub(crate) async fn start_conversation(
        &self,
        token: &CancellationToken,
        params: &ActionParams,
    ) -> Result<ActionResult, AgentError> {
        let payload: NewConversationPayload =
            control::payload(ControlAction::NewConversation, params)?;
        let message = Message::assistant(payload.message);

        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(AgentError::Expired),
            sent = self.conv_tx.send(message) => {
                if sent.is_err() {
                    warn!(agent = %self.name, "Conversation channel closed");
                }
            }
        }
        Ok(ActionResult::text("conversation started"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentBuilder;
    use crate::persistence::{FileStateStore, StateStore};
    use crate::test_helpers::*;

    #[test]
    fn fold_links_result_to_call() {
        let mut conv = vec![Message::user("weather?")];
        let params = ActionParams::new().with("city", "boston");
        fold_action(&mut conv, "get_weather", &params, "30C");

        assert_eq!(conv.len(), 3);
        let call = &conv[1].tool_calls[0];
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.arguments, r#"{"city":"boston"}"#);
        assert_eq!(conv[2].tool_call_id.as_deref(), Some(call.id.as_str()));
        assert_eq!(conv[2].content, "30C");
    }

    #[tokio::test]
    async fn action_errors_become_result_text() {
        let agent = AgentBuilder::new("tester", Arc::new(SequentialMockProvider::new(vec![])))
            .build()
            .await
            .unwrap();
        let action: Arc<dyn Action> = Arc::new(FailingAction);
        let job = Job::new();

        let result = agent
            .run_action(&job, &CancellationToken::new(), &action, ActionParams::new(), None)
            .await
            .unwrap();
        assert!(result.result.starts_with("Error running tool:"));
        assert!(result.result.contains("service unavailable"));
    }

    #[tokio::test]
    async fn action_sees_job_metadata() {
        let agent = AgentBuilder::new("tester", Arc::new(SequentialMockProvider::new(vec![])))
            .build()
            .await
            .unwrap();
        let action: Arc<dyn Action> = Arc::new(MetadataAction);
        let job = Job::new().with_metadata(crate::job::REMINDER_KEY, true);

        let result = agent
            .run_action(&job, &CancellationToken::new(), &action, ActionParams::new(), None)
            .await
            .unwrap();
        assert_eq!(result.result, "reminder");
    }

    #[tokio::test]
    async fn state_update_persists_and_notes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStateStore::new(dir.path()));
        let agent = AgentBuilder::new("tester", Arc::new(SequentialMockProvider::new(vec![])))
            .with_state_store(store.clone())
            .build()
            .await
            .unwrap();

        let mut conv = Vec::new();
        let params = ActionParams::new()
            .with("goal", "learn rust")
            .with("now_doing", "reading");
        let result = agent.update_state(&mut conv, &params).unwrap();

        assert_eq!(result.result, "State updated");
        assert_eq!(agent.current_state().goal, "learn rust");
        assert_eq!(store.load_state("tester").unwrap().now_doing, "reading");
        assert_eq!(conv.len(), 1);
        assert!(conv[0].content.starts_with("Internal state updated:"));
    }

    #[tokio::test]
    async fn bad_state_payload_is_fatal() {
        let agent = AgentBuilder::new("tester", Arc::new(SequentialMockProvider::new(vec![])))
            .build()
            .await
            .unwrap();
        let mut conv = Vec::new();
        let params = ActionParams::new().with("memories", "not a list");
        let err = agent.update_state(&mut conv, &params).unwrap_err();
        assert!(matches!(err, AgentError::InvalidPayload { .. }));
        assert!(conv.is_empty());
    }
}
