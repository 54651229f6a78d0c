//! The planning sub-loop.
//!
//! A `plan` call names an ordered list of subtasks. Each one is resolved to a
//! plannable action up front; then, one at a time, its parameters are
//! generated and it runs exactly like a top-level action would.

use autoclaw_core::{ActionParams, ActionResult, Message, Observable};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agent::Agent;
use crate::control::{self, ControlAction, PlanPayload, Toolbox};
use crate::error::AgentError;
use crate::execution::fold_action;
use crate::job::{ActionCurrentState, ActionState, Job};
use crate::prompts;

pub(crate) enum PlanOutcome {
    Completed(ActionResult),
    /// The reasoning callback vetoed a subtask.
    Stopped,
}

impl Agent {
    pub(crate) async fn run_plan(
        &self,
        job: &mut Job,
        token: &CancellationToken,
        conversation: &mut Vec<Message>,
        toolbox: &Toolbox,
        params: &ActionParams,
        parent: Option<&Observable>,
    ) -> Result<PlanOutcome, AgentError> {
        let plan: PlanPayload = control::payload(ControlAction::Plan, params)?;
        if plan.subtasks.is_empty() {
            return Err(AgentError::Planning("plan has no subtasks".into()));
        }

        let mut steps = Vec::with_capacity(plan.subtasks.len());
        for subtask in &plan.subtasks {
            let action = toolbox.resolve_plannable(&subtask.action).ok_or_else(|| {
                AgentError::Planning(format!(
                    "subtask uses unknown or non-plannable action `{}`",
                    subtask.action
                ))
            })?;
            steps.push((action, subtask));
        }

        let total = steps.len();
        info!(agent = %self.name, job_id = %job.uuid, goal = %plan.goal, subtasks = total, "Executing plan");
        fold_action(
            conversation,
            ControlAction::Plan.name(),
            params,
            &format!("Plan accepted: {total} subtasks"),
        );

        let mut done = Vec::with_capacity(total);
        for (index, (action, subtask)) in steps.into_iter().enumerate() {
            let def = action.definition();
            let instruction = prompts::subtask(index, total, &plan.goal, &subtask.reasoning);
            let step_params = self
                .generate_parameters(parent, token, conversation, &def, &instruction)
                .await?;

            let current = ActionCurrentState {
                job_id: job.uuid.clone(),
                action: def.clone(),
                params: step_params.clone(),
                reasoning: subtask.reasoning.clone(),
            };
            if let Some(callback) = &job.reasoning_callback
                && !callback(&current)
            {
                info!(agent = %self.name, job_id = %job.uuid, action = %def.name, "Plan stopped by callback");
                job.record_step(ActionState {
                    current,
                    result: ActionResult::text(prompts::STOPPED_BY_CALLBACK),
                });
                return Ok(PlanOutcome::Stopped);
            }

            let result = self
                .run_action(job, token, &action, step_params.clone(), parent)
                .await?;
            fold_action(conversation, &def.name, &step_params, &result.result);
            job.past_actions.push((def.name.clone(), step_params));
            done.push(def.name.clone());
            job.record_step(ActionState { current, result });
        }

        Ok(PlanOutcome::Completed(ActionResult::text(format!(
            "planning {}, subtasks: {}",
            plan.goal,
            done.join(", ")
        ))))
    }
}
