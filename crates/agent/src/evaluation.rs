//! Self-evaluation: did the finished turn satisfy the user's goal?

use autoclaw_core::{Message, Observable};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::Agent;
use crate::error::AgentError;
use crate::prompts;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GoalExtraction {
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GoalEvaluation {
    #[serde(default)]
    pub satisfied: bool,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

pub(crate) enum Evaluation {
    Satisfied,
    Unsatisfied { gaps: Vec<String>, reasoning: String },
}

fn extraction_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "goal": { "type": "string", "description": "The user's goal" },
            "constraints": { "type": "array", "items": { "type": "string" }, "description": "Constraints the answer must respect" },
            "context": { "type": "string", "description": "Relevant context" }
        },
        "required": ["goal", "constraints", "context"]
    })
}

fn evaluation_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "satisfied": { "type": "boolean", "description": "Whether the goal is satisfied" },
            "gaps": { "type": "array", "items": { "type": "string" }, "description": "What is still missing" },
            "reasoning": { "type": "string", "description": "Why" }
        },
        "required": ["satisfied", "gaps", "reasoning"]
    })
}

impl Agent {
    /// Two schema-constrained calls: extract the goal, then judge it.
    pub(crate) async fn evaluate_job(
        &self,
        parent: Option<&Observable>,
        token: &CancellationToken,
        conversation: &[Message],
    ) -> Result<Evaluation, AgentError> {
        let extraction: GoalExtraction = self
            .structured(
                parent,
                token,
                conversation,
                "extract_goal",
                extraction_schema(),
                prompts::EXTRACT_GOAL,
            )
            .await?;

        let mut conv = conversation.to_vec();
        if !extraction.context.is_empty() {
            conv.push(Message::system(format!("Context: {}", extraction.context)));
        }
        let evaluation: GoalEvaluation = self
            .structured(
                parent,
                token,
                &conv,
                "evaluate_goal",
                evaluation_schema(),
                &prompts::evaluate_goal(&extraction.goal, &extraction.constraints),
            )
            .await?;

        debug!(
            agent = %self.name,
            goal = %extraction.goal,
            satisfied = evaluation.satisfied,
            "Goal evaluated"
        );
        if evaluation.satisfied {
            Ok(Evaluation::Satisfied)
        } else {
            Ok(Evaluation::Unsatisfied {
                gaps: evaluation.gaps,
                reasoning: evaluation.reasoning,
            })
        }
    }
}
