//! Jobs and their results.
//!
//! A [`Job`] is one unit of work handed to an agent. Its [`JobResult`] is the
//! future callers wait on: it accumulates per-step [`ActionState`] records and
//! is finished exactly once, after which [`JobResult::wait_result`] returns.

use autoclaw_core::{ActionDefinition, ActionParams, ActionResult, ActionSet, Message};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::control::Chosen;
use crate::error::AgentError;

/// Metadata key set on jobs submitted by the scheduler executor.
pub const REMINDER_KEY: &str = "is_reminder";

/// Invoked before each action runs. Returning `false` stops the job.
pub type ReasoningCallback = Arc<dyn Fn(&ActionCurrentState) -> bool + Send + Sync>;

/// Invoked after each completed action step.
pub type ResultCallback = Arc<dyn Fn(&ActionState) + Send + Sync>;

type Finalizer = Box<dyn FnOnce(&[Message]) + Send>;

/// Who is speaking in the job's prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobRole {
    /// A request from a user or connector.
    #[default]
    User,
    /// An introspective prompt synthesized by the agent itself.
    System,
}

/// Snapshot of what the agent is about to do.
#[derive(Debug, Clone, Serialize)]
pub struct ActionCurrentState {
    pub job_id: String,
    pub action: ActionDefinition,
    pub params: ActionParams,
    pub reasoning: String,
}

/// A completed step: what was done and what came back.
#[derive(Debug, Clone, Serialize)]
pub struct ActionState {
    #[serde(flatten)]
    pub current: ActionCurrentState,
    pub result: ActionResult,
}

/// An action chosen by a decision but not executed yet.
#[derive(Clone)]
pub(crate) struct PendingAction {
    pub chosen: Chosen,
    pub params: Option<ActionParams>,
    pub reasoning: String,
}

/// A unit of work for an agent.
pub struct Job {
    pub(crate) uuid: String,
    pub(crate) text: String,
    pub(crate) image: Option<String>,
    pub(crate) conversation_history: Vec<Message>,
    pub(crate) metadata: serde_json::Map<String, serde_json::Value>,
    pub(crate) role: JobRole,
    pub(crate) actions: ActionSet,
    pub(crate) reasoning_callback: Option<ReasoningCallback>,
    pub(crate) result_callback: Option<ResultCallback>,
    pub(crate) cancel: CancellationToken,
    pub(crate) result: Arc<JobResult>,
    pub(crate) next_action: Option<PendingAction>,
    pub(crate) past_actions: Vec<(String, ActionParams)>,
    pub(crate) evaluation_loop: u32,
}

impl Job {
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            text: String::new(),
            image: None,
            conversation_history: Vec::new(),
            metadata: serde_json::Map::new(),
            role: JobRole::User,
            actions: ActionSet::new(),
            reasoning_callback: None,
            result_callback: None,
            cancel: CancellationToken::new(),
            result: Arc::new(JobResult::new()),
            next_action: None,
            past_actions: Vec::new(),
            evaluation_loop: 0,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Attach an image (URL or data URI).
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Seed the conversation with earlier messages.
    pub fn with_conversation_history(mut self, history: Vec<Message>) -> Self {
        self.conversation_history = history;
        self
    }

    pub fn with_reasoning_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ActionCurrentState) -> bool + Send + Sync + 'static,
    {
        self.reasoning_callback = Some(Arc::new(callback));
        self
    }

    pub fn with_result_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ActionState) + Send + Sync + 'static,
    {
        self.result_callback = Some(Arc::new(callback));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    /// Use a caller-owned token; cancelling it expires the job.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Extra actions available only while this job runs.
    pub fn with_actions(mut self, actions: ActionSet) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_role(mut self, role: JobRole) -> Self {
        self.role = role;
        self
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn role(&self) -> JobRole {
        self.role
    }

    pub fn metadata(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata
    }

    pub fn is_reminder(&self) -> bool {
        self.metadata
            .get(REMINDER_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Autonomous runs are processed with the system role.
    pub(crate) fn is_self_run(&self) -> bool {
        self.role == JobRole::System
    }

    /// Handle to this job's future.
    pub fn result(&self) -> Arc<JobResult> {
        self.result.clone()
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Times an identical call (same name and params) already ran in this job.
    pub(crate) fn repeat_count(&self, name: &str, params: &ActionParams) -> usize {
        self.past_actions
            .iter()
            .filter(|(n, p)| n == name && p == params)
            .count()
    }

    pub(crate) fn record_step(&self, state: ActionState) {
        if let Some(cb) = &self.result_callback {
            cb(&state);
        }
        self.result.push_state(state);
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

/// Final view of a finished job.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub state: Vec<ActionState>,
    pub conversation: Vec<Message>,
    pub response: String,
    pub error: Option<Arc<AgentError>>,
}

struct ResultInner {
    state: Vec<ActionState>,
    conversation: Vec<Message>,
    response: String,
    error: Option<Arc<AgentError>>,
    finalizers: Vec<Finalizer>,
    finished: bool,
}

/// The future of a [`Job`].
///
/// All mutation happens under one lock. The ready flag flips exactly once,
/// after finalizers have run.
pub struct JobResult {
    inner: Mutex<ResultInner>,
    ready: watch::Sender<bool>,
    extra_finishes: AtomicUsize,
}

impl JobResult {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            inner: Mutex::new(ResultInner {
                state: Vec::new(),
                conversation: Vec::new(),
                response: String::new(),
                error: None,
                finalizers: Vec::new(),
                finished: false,
            }),
            ready,
            extra_finishes: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ResultInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push_state(&self, state: ActionState) {
        self.lock().state.push(state);
    }

    pub(crate) fn set_conversation(&self, conversation: Vec<Message>) {
        self.lock().conversation = conversation;
    }

    pub(crate) fn set_response(&self, response: impl Into<String>) {
        self.lock().response = response.into();
    }

    /// Register a callback run with the final conversation when the job finishes.
    pub(crate) fn add_finalizer<F>(&self, finalizer: F)
    where
        F: FnOnce(&[Message]) + Send + 'static,
    {
        self.lock().finalizers.push(Box::new(finalizer));
    }

    /// Finish the job. Only the first call takes effect; later calls are
    /// counted, logged and ignored. Returns whether this call finished it.
    pub fn finish(&self, outcome: Result<(), AgentError>) -> bool {
        let (finalizers, conversation) = {
            let mut inner = self.lock();
            if inner.finished {
                drop(inner);
                let n = self.extra_finishes.fetch_add(1, Ordering::SeqCst) + 1;
                warn!(extra_finishes = n, "JobResult finished more than once");
                return false;
            }
            inner.finished = true;
            if let Err(e) = outcome {
                inner.error = Some(Arc::new(e));
            }
            (std::mem::take(&mut inner.finalizers), inner.conversation.clone())
        };

        for finalizer in finalizers {
            finalizer(&conversation);
        }
        self.ready.send_replace(true);
        true
    }

    pub fn is_finished(&self) -> bool {
        *self.ready.borrow()
    }

    /// Number of ignored `finish` calls.
    pub fn extra_finish_calls(&self) -> usize {
        self.extra_finishes.load(Ordering::SeqCst)
    }

    /// Block until the job is finished, then return its final fields.
    pub async fn wait_result(&self) -> JobOutput {
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`, so this only returns once ready.
        let _ = rx.wait_for(|ready| *ready).await;
        self.snapshot()
    }

    fn snapshot(&self) -> JobOutput {
        let inner = self.lock();
        JobOutput {
            state: inner.state.clone(),
            conversation: inner.conversation.clone(),
            response: inner.response.clone(),
            error: inner.error.clone(),
        }
    }
}

impl Default for JobResult {
    fn default() -> Self {
        Self::new()
    }
}
