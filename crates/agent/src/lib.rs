//! The agent runtime: a job queue, a decision engine and a run loop.
//!
//! An [`Agent`] owns a bounded queue of [`Job`]s. Its run loop takes one job
//! at a time and drives it to completion:
//!
//! 1. **Build** the conversation (system prompt, HUD, knowledge, history)
//! 2. **Pick** an action, or a control action (`reply`, `plan`, `stop`, ...)
//! 3. **Generate** parameters for it with a forced tool call
//! 4. **Run** it, fold the result into the conversation, and re-evaluate
//! 5. **Reply** once the model chooses to answer, optionally self-evaluating
//!
//! When the queue stays idle for the configured period, the agent submits a
//! job to itself and runs autonomously toward its permanent goal.

pub mod agent;
pub mod control;
mod decision;
pub mod error;
mod evaluation;
mod execution;
pub mod executor;
pub mod job;
pub mod options;
pub mod persistence;
mod planning;
mod prompts;

#[cfg(test)]
mod test_helpers;

pub use agent::{Agent, AgentBuilder, ConversationSubscriber};
pub use control::{Chosen, ControlAction};
pub use error::AgentError;
pub use executor::{AgentExecutor, AgentPool};
pub use job::{ActionCurrentState, ActionState, Job, JobOutput, JobResult, JobRole, REMINDER_KEY};
pub use options::AgentOptions;
pub use persistence::{ConversationLog, FileStateStore, StateStore};
