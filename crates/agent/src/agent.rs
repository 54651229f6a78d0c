//! The agent: run loop, job state machine and public API.
//!
//! Each agent owns a single consumer task ([`Agent::run`]) that multiplexes
//! three inputs: queued jobs, the root cancellation token and a periodic
//! timer for autonomous runs. Jobs are processed strictly one at a time.
//!
//! Within a job, `drive_job` is the decision loop:
//!
//! 1. pick an action (or a free-text answer)
//! 2. generate its parameters if the pick did not carry them
//! 3. run it and fold the result into the conversation
//! 4. re-evaluate: reply, or stash the follow-up and go around again
//!
//! The loop is bounded by `max_turns`.

use autoclaw_core::observer::{Completion, Creation};
use autoclaw_core::{
    Action, ActionParams, ActionResult, ActionSet, AgentInternalState, Character, Message, Observable, Observer,
    Provider, RagDb, Role,
};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::control::{self, Chosen, ControlAction, ReplyPayload, Toolbox};
use crate::decision::Pick;
use crate::error::AgentError;
use crate::evaluation::Evaluation;
use crate::execution::fold_action;
use crate::job::{ActionCurrentState, ActionState, Job, JobOutput, JobResult, JobRole, PendingAction};
use crate::options::AgentOptions;
use crate::persistence::{ConversationLog, StateStore};
use crate::planning::PlanOutcome;
use crate::prompts;

/// Receives messages of conversations the agent starts on its own.
pub type ConversationSubscriber = Arc<dyn Fn(&Message) + Send + Sync>;

/// Timer period used when autonomous runs are disabled; its ticks are ignored.
const IDLE_PERIOD: Duration = Duration::from_secs(3600);

/// Minimum length of both sides of an exchange worth remembering.
const MIN_MEMORY_LEN: usize = 10;

/// Mutable state shared between the run loop and API callers.
pub(crate) struct Shared {
    pub current_state: AgentInternalState,
    pub character: Option<Character>,
    pub paused: bool,
    pub subscribers: Vec<ConversationSubscriber>,
    /// Token of the job currently being processed.
    pub action_cancel: Option<CancellationToken>,
}

enum Flow {
    Done,
    /// Self-evaluation found gaps; run another turn.
    Retry,
}

enum Step {
    Run(Arc<dyn Action>),
    Plan,
    State,
    Converse,
}

pub struct Agent {
    pub(crate) name: String,
    pub(crate) options: AgentOptions,
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) actions: ActionSet,
    pub(crate) rag: Option<Arc<dyn RagDb>>,
    pub(crate) observer: Option<Arc<dyn Observer>>,
    pub(crate) store: Option<Arc<dyn StateStore>>,
    pub(crate) log: Option<ConversationLog>,
    shared: Mutex<Shared>,
    jobs_tx: mpsc::Sender<Job>,
    jobs_rx: Mutex<Option<mpsc::Receiver<Job>>>,
    pub(crate) conv_tx: mpsc::Sender<Message>,
    conv_rx: Mutex<Option<mpsc::Receiver<Message>>>,
    root: CancellationToken,
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    name: String,
    provider: Arc<dyn Provider>,
    options: AgentOptions,
    actions: ActionSet,
    rag: Option<Arc<dyn RagDb>>,
    observer: Option<Arc<dyn Observer>>,
    store: Option<Arc<dyn StateStore>>,
    log: Option<ConversationLog>,
    character: Option<Character>,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        Self {
            name: name.into(),
            provider,
            options: AgentOptions::default(),
            actions: ActionSet::new(),
            rag: None,
            observer: None,
            store: None,
            log: None,
            character: None,
        }
    }

    pub fn with_options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_actions(mut self, actions: ActionSet) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_action(mut self, action: Arc<dyn Action>) -> Self {
        self.actions.register(action);
        self
    }

    /// Knowledge base for prompt enrichment, and long-term memory when enabled.
    pub fn with_knowledge(mut self, rag: Arc<dyn RagDb>) -> Self {
        self.rag = Some(rag);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_conversation_log(mut self, log: ConversationLog) -> Self {
        self.log = Some(log);
        self
    }

    /// A fixed character; wins over a persisted or generated one.
    pub fn with_character(mut self, character: Character) -> Self {
        self.character = Some(character);
        self
    }

    /// Build the agent, loading persisted state and character.
    ///
    /// When no character is known and `random_identity` is set, one is
    /// generated with a structured model call and persisted.
    pub async fn build(self) -> Result<Arc<Agent>, AgentError> {
        let (jobs_tx, jobs_rx) = mpsc::channel(1);
        let (conv_tx, conv_rx) = mpsc::channel(1);

        let current_state = self
            .store
            .as_ref()
            .and_then(|s| s.load_state(&self.name))
            .unwrap_or_default();
        let character = self
            .character
            .or_else(|| self.store.as_ref().and_then(|s| s.load_character(&self.name)));

        let agent = Agent {
            name: self.name,
            options: self.options,
            provider: self.provider,
            actions: self.actions,
            rag: self.rag,
            observer: self.observer,
            store: self.store,
            log: self.log,
            shared: Mutex::new(Shared {
                current_state,
                character,
                paused: false,
                subscribers: Vec::new(),
                action_cancel: None,
            }),
            jobs_tx,
            jobs_rx: Mutex::new(Some(jobs_rx)),
            conv_tx,
            conv_rx: Mutex::new(Some(conv_rx)),
            root: CancellationToken::new(),
        };

        if agent.options.random_identity && agent.character().is_none() {
            let character = agent.generate_character().await?;
            info!(agent = %agent.name, character = %character.name, "Generated character");
            if let Some(store) = &agent.store
                && let Err(e) = store.save_character(&agent.name, &character)
            {
                warn!(agent = %agent.name, "Failed to persist character: {e}");
            }
            agent.lock().character = Some(character);
        }

        Ok(Arc::new(agent))
    }
}

impl Agent {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_state(&self) -> AgentInternalState {
        self.lock().current_state.clone()
    }

    pub fn character(&self) -> Option<Character> {
        self.lock().character.clone()
    }

    pub fn pause(&self) {
        self.lock().paused = true;
        info!(agent = %self.name, "Agent paused");
    }

    pub fn resume(&self) {
        self.lock().paused = false;
        info!(agent = %self.name, "Agent resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    /// Cancel the job currently being processed, if any.
    pub fn stop_action(&self) {
        if let Some(token) = self.lock().action_cancel.take() {
            debug!(agent = %self.name, "Cancelling running action");
            token.cancel();
        }
    }

    /// Stop the agent for good. The run loop exits with [`AgentError::Stopped`].
    pub fn stop(&self) {
        self.stop_action();
        self.root.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Register a callback for conversations the agent starts itself.
    pub fn subscribe_conversations<F>(&self, callback: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.lock().subscribers.push(Arc::new(callback));
    }

    /// Queue a job and return its future.
    pub async fn enqueue(&self, job: Job) -> Arc<JobResult> {
        let result = job.result();
        if self.root.is_cancelled() {
            result.finish(Err(AgentError::Stopped));
            return result;
        }

        let cancel = job.cancel.clone();
        tokio::select! {
            biased;
            _ = self.root.cancelled() => {
                result.finish(Err(AgentError::Stopped));
            }
            _ = cancel.cancelled() => {
                result.finish(Err(AgentError::Expired));
            }
            sent = self.jobs_tx.send(job) => {
                if let Err(mpsc::error::SendError(job)) = sent {
                    job.result.finish(Err(AgentError::Stopped));
                }
            }
        }
        result
    }

    /// Preempt whatever is running, queue `job` and wait for it.
    pub async fn ask(&self, job: Job) -> JobOutput {
        self.stop_action();
        self.enqueue(job).await.wait_result().await
    }

    /// The run loop. Returns once the agent is stopped.
    pub async fn run(self: Arc<Self>) -> Result<(), AgentError> {
        let mut jobs = self
            .jobs_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(AgentError::AlreadyRunning)?;
        let fan_out = self
            .conv_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|rx| tokio::spawn(self.clone().fan_out(rx)));

        let period = if self.options.autonomous() {
            self.options.periodic_runs
        } else {
            IDLE_PERIOD
        };
        let mut timer = tokio::time::interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(agent = %self.name, autonomous = self.options.autonomous(), "Agent started");

        let outcome = loop {
            tokio::select! {
                biased;
                _ = self.root.cancelled() => break Err(AgentError::Stopped),
                job = jobs.recv() => match job {
                    Some(job) => {
                        self.consume_job(job).await;
                        // The idle period counts from the end of the job.
                        timer.reset();
                    }
                    None => break Err(AgentError::Stopped),
                },
                _ = timer.tick() => {
                    if self.options.autonomous() {
                        self.periodically_run().await;
                        timer.reset();
                    }
                }
            }
        };

        jobs.close();
        while let Ok(job) = jobs.try_recv() {
            job.result.finish(Err(AgentError::Stopped));
        }
        if let Some(handle) = fan_out {
            handle.abort();
        }
        info!(agent = %self.name, "Agent stopped");
        outcome
    }

    async fn fan_out(self: Arc<Self>, mut rx: mpsc::Receiver<Message>) {
        while let Some(message) = rx.recv().await {
            let subscribers = self.lock().subscribers.clone();
            debug!(agent = %self.name, subscribers = subscribers.len(), "New conversation");
            for subscriber in subscribers {
                subscriber(&message);
            }
        }
    }

    async fn periodically_run(&self) {
        if !self.options.standalone_job {
            return;
        }
        info!(agent = %self.name, "Periodic run");
        let job = Job::new()
            .with_text(prompts::self_run(self.options.permanent_goal.as_deref()))
            .with_role(JobRole::System);
        let result = job.result();
        self.consume_job(job).await;

        let out = result.wait_result().await;
        match out.error {
            Some(e) => warn!(agent = %self.name, "Periodic run failed: {e}"),
            None => debug!(agent = %self.name, steps = out.state.len(), "Periodic run finished"),
        }
    }

    /// Process one job and finish its result exactly once.
    async fn consume_job(&self, mut job: Job) {
        let result = job.result();
        if job.cancel.is_cancelled() {
            result.finish(Err(AgentError::Expired));
            return;
        }
        if self.is_paused() {
            debug!(agent = %self.name, job_id = %job.uuid, "Agent paused, rejecting job");
            result.finish(Err(AgentError::Paused));
            return;
        }

        let token = job.cancel.child_token();
        self.lock().action_cancel = Some(token.clone());
        let obs = self.open_observable(
            None,
            "job",
            "robot",
            Some(serde_json::json!({ "job_id": job.uuid, "text": job.text })),
        );
        info!(agent = %self.name, job_id = %job.uuid, "Job started");

        let mut conversation = Vec::new();
        let outcome = self
            .drive_job(&mut job, &token, &mut conversation, obs.as_ref())
            .await;
        self.lock().action_cancel = None;

        match &outcome {
            Ok(()) => info!(agent = %self.name, job_id = %job.uuid, "Job finished"),
            Err(e) => warn!(agent = %self.name, job_id = %job.uuid, "Job failed: {e}"),
        }
        if let (Some(observer), Some(mut obs)) = (&self.observer, obs) {
            obs.completion = Some(Completion {
                error: outcome.as_ref().err().map(ToString::to_string),
                conversation: conversation.clone(),
                action_result: None,
            });
            observer.update(obs);
        }

        result.set_conversation(conversation);
        result.finish(outcome);
    }

    async fn drive_job(
        &self,
        job: &mut Job,
        token: &CancellationToken,
        conversation: &mut Vec<Message>,
        parent: Option<&Observable>,
    ) -> Result<(), AgentError> {
        let toolbox = self.toolbox(job);
        *conversation = self.process_prompts(job, token).await?;

        let mut turns = 0u32;
        loop {
            turns += 1;
            if turns > self.options.max_turns {
                return Err(AgentError::TurnLimit(self.options.max_turns));
            }
            debug!(agent = %self.name, job_id = %job.uuid, turn = turns, "Turn");

            let pending = match job.next_action.take() {
                Some(pending) => pending,
                None => {
                    let prompt = prompts::pick(
                        &toolbox.definitions(),
                        self.options.permanent_goal.as_deref(),
                    );
                    match self
                        .pick_action(parent, token, conversation, &toolbox, prompt)
                        .await?
                    {
                        Pick::Action(pending) => pending,
                        Pick::Nothing { message } => {
                            let text = if message.is_empty() {
                                self.compose_reply(parent, token, conversation, "").await?
                            } else {
                                message
                            };
                            match self.reply(job, token, conversation, text, parent).await? {
                                Flow::Done => return Ok(()),
                                Flow::Retry => continue,
                            }
                        }
                    }
                }
            };

            let PendingAction {
                chosen,
                params,
                reasoning,
            } = pending;
            let step = match &chosen {
                Chosen::Control(ControlAction::Stop) => {
                    info!(agent = %self.name, job_id = %job.uuid, "Agent chose to stop");
                    return Ok(());
                }
                Chosen::Control(ControlAction::Reply) => {
                    let text = self
                        .reply_text(parent, token, conversation, params.as_ref())
                        .await?;
                    match self.reply(job, token, conversation, text, parent).await? {
                        Flow::Done => return Ok(()),
                        Flow::Retry => continue,
                    }
                }
                Chosen::Control(ControlAction::Plan) => Step::Plan,
                Chosen::Control(ControlAction::State) => Step::State,
                Chosen::Control(ControlAction::NewConversation) => Step::Converse,
                Chosen::Action(action) => Step::Run(action.clone()),
            };

            let def = toolbox.definition_of(&chosen);
            let params = match params {
                Some(params) => params,
                None => {
                    self.generate_parameters(parent, token, conversation, &def, &reasoning)
                        .await?
                }
            };

            if self.options.loop_detection > 0
                && job.repeat_count(&def.name, &params) > self.options.loop_detection
            {
                warn!(agent = %self.name, job_id = %job.uuid, action = %def.name, "Loop detected, replying instead");
                let text = self.compose_reply(parent, token, conversation, "").await?;
                match self.reply(job, token, conversation, text, parent).await? {
                    Flow::Done => return Ok(()),
                    Flow::Retry => continue,
                }
            }

            let current = ActionCurrentState {
                job_id: job.uuid.clone(),
                action: def.clone(),
                params: params.clone(),
                reasoning,
            };
            if let Some(callback) = &job.reasoning_callback
                && !callback(&current)
            {
                info!(agent = %self.name, job_id = %job.uuid, action = %def.name, "Stopped by reasoning callback");
                job.record_step(ActionState {
                    current,
                    result: ActionResult::text(prompts::STOPPED_BY_CALLBACK),
                });
                return Ok(());
            }

            debug!(agent = %self.name, job_id = %job.uuid, action = %def.name, "Executing");
            let result = match step {
                Step::Run(action) => {
                    let result = self
                        .run_action(job, token, &action, params.clone(), parent)
                        .await?;
                    fold_action(conversation, &def.name, &params, &result.result);
                    result
                }
                Step::Plan => {
                    match self
                        .run_plan(job, token, conversation, &toolbox, &params, parent)
                        .await?
                    {
                        PlanOutcome::Completed(result) => result,
                        PlanOutcome::Stopped => return Ok(()),
                    }
                }
                Step::State => self.update_state(conversation, &params)?,
                Step::Converse => {
                    let result = self.start_conversation(token, &params).await?;
                    fold_action(conversation, &def.name, &params, &result.result);
                    result
                }
            };
            job.past_actions.push((def.name.clone(), params));
            job.record_step(ActionState { current, result });

            let prompt = prompts::reevaluation(&toolbox.definitions());
            match self
                .pick_action(parent, token, conversation, &toolbox, prompt)
                .await?
            {
                Pick::Nothing { message } => {
                    let text = if self.options.force_reasoning || message.is_empty() {
                        self.compose_reply(parent, token, conversation, &message).await?
                    } else {
                        message
                    };
                    match self.reply(job, token, conversation, text, parent).await? {
                        Flow::Done => return Ok(()),
                        Flow::Retry => continue,
                    }
                }
                Pick::Action(next) if next.chosen.is(ControlAction::Reply) => {
                    let text = self
                        .reply_text(parent, token, conversation, next.params.as_ref())
                        .await?;
                    match self.reply(job, token, conversation, text, parent).await? {
                        Flow::Done => return Ok(()),
                        Flow::Retry => continue,
                    }
                }
                Pick::Action(next) => {
                    debug!(agent = %self.name, job_id = %job.uuid, next = %next.chosen.name(), "Follow-up action");
                    job.next_action = Some(next);
                }
            }
        }
    }

    /// Text of a `reply` call, composed by the model when the call has none.
    async fn reply_text(
        &self,
        parent: Option<&Observable>,
        token: &CancellationToken,
        conversation: &[Message],
        params: Option<&ActionParams>,
    ) -> Result<String, AgentError> {
        let message = match params {
            Some(params) => control::payload::<ReplyPayload>(ControlAction::Reply, params)?.message,
            None => String::new(),
        };
        if message.is_empty() {
            self.compose_reply(parent, token, conversation, "").await
        } else {
            Ok(message)
        }
    }

    /// Terminal reply path. May ask for another turn when self-evaluation
    /// finds gaps.
    async fn reply(
        &self,
        job: &mut Job,
        token: &CancellationToken,
        conversation: &mut Vec<Message>,
        text: String,
        parent: Option<&Observable>,
    ) -> Result<Flow, AgentError> {
        conversation.push(Message::assistant(text.clone()));

        if self.options.enable_evaluation && job.evaluation_loop < self.options.max_evaluation_loops {
            match self.evaluate_job(parent, token, conversation).await {
                Ok(Evaluation::Satisfied) => {}
                Ok(Evaluation::Unsatisfied { gaps, reasoning }) => {
                    job.evaluation_loop += 1;
                    info!(
                        agent = %self.name,
                        job_id = %job.uuid,
                        evaluation_loop = job.evaluation_loop,
                        gaps = gaps.len(),
                        "Goal not satisfied, continuing"
                    );
                    conversation.push(Message::system(prompts::gap_summary(&gaps, &reasoning)));
                    return Ok(Flow::Retry);
                }
                Err(AgentError::Expired) => return Err(AgentError::Expired),
                Err(e) => warn!(agent = %self.name, job_id = %job.uuid, "Self-evaluation failed: {e}"),
            }
        }

        job.result.set_response(text);
        self.register_finalizer(&job.result);
        Ok(Flow::Done)
    }

    fn register_finalizer(&self, result: &JobResult) {
        let agent = self.name.clone();
        let log = self.log.clone();
        let memory = if self.options.long_term_memory {
            self.rag.clone()
        } else {
            None
        };

        result.add_finalizer(move |conversation| {
            if let Some(log) = log
                && let Err(e) = log.write(&agent, "conversation", conversation)
            {
                warn!(agent = %agent, "Failed to write conversation log: {e}");
            }
            let Some(rag) = memory else {
                return;
            };
            let Some(summary) = exchange_summary(conversation) else {
                return;
            };
            tokio::spawn(async move {
                if let Err(e) = rag.store(&summary).await {
                    warn!(agent = %agent, "Failed to save conversation to memory: {e}");
                }
            });
        });
    }

    /// Build the conversation a job starts from.
    async fn process_prompts(
        &self,
        job: &Job,
        token: &CancellationToken,
    ) -> Result<Vec<Message>, AgentError> {
        let mut prefix = Vec::new();
        if let Some(system_prompt) = &self.options.system_prompt {
            prefix.push(Message::system(system_prompt.clone()));
        }

        if self.options.enable_hud {
            let (state, character) = {
                let shared = self.lock();
                (shared.current_state.clone(), shared.character.clone())
            };
            let character = character.filter(|_| self.options.show_character);
            prefix.push(Message::system(prompts::hud(
                character.as_ref(),
                self.options.permanent_goal.as_deref(),
                &state,
            )));
        }

        if self.options.enable_kb
            && let Some(rag) = &self.rag
            && !job.text.is_empty()
        {
            match rag.search(&job.text, self.options.kb_results).await {
                Ok(hits) if !hits.is_empty() => {
                    debug!(agent = %self.name, hits = hits.len(), "Knowledge base hits");
                    prefix.push(Message::system(prompts::knowledge(&hits)));
                }
                Ok(_) => {}
                Err(e) => warn!(agent = %self.name, "Knowledge base search failed: {e}"),
            }
        }

        let mut conversation = prefix;
        conversation.extend(job.conversation_history.iter().cloned());

        if let Some(image) = &job.image {
            match self.describe_image(token, image).await {
                Ok(description) if !description.is_empty() => {
                    conversation.push(Message::system(prompts::image_description(&description)));
                }
                Ok(_) => {}
                Err(AgentError::Expired) => return Err(AgentError::Expired),
                Err(e) => warn!(agent = %self.name, "Failed to describe image: {e}"),
            }
        }

        if !job.text.is_empty() || job.image.is_some() {
            let message = match (job.role, &job.image) {
                (JobRole::System, _) => Message::system(job.text.clone()),
                (JobRole::User, Some(image)) => Message::user_with_image(job.text.clone(), image.clone()),
                (JobRole::User, None) => Message::user(job.text.clone()),
            };
            conversation.push(message);
        }
        Ok(conversation)
    }

    /// Base actions, job actions and the control actions enabled for this job.
    fn toolbox(&self, job: &Job) -> Toolbox {
        let mut actions = self.actions.clone();
        actions.extend(&job.actions);

        let mut controls = vec![ControlAction::Reply];
        if self.options.can_stop_itself {
            controls.push(ControlAction::Stop);
        }
        if self.options.enable_hud {
            controls.push(ControlAction::State);
        }
        if self.options.initiate_conversations && job.is_self_run() {
            controls.push(ControlAction::NewConversation);
        }
        if self.options.can_plan {
            controls.push(ControlAction::Plan);
        }
        Toolbox { actions, controls }
    }

    async fn generate_character(&self) -> Result<Character, AgentError> {
        self.structured(
            None,
            &self.root,
            &[],
            "generate_character",
            Character::schema(),
            &prompts::identity(self.options.identity_guidance.as_deref()),
        )
        .await
    }

    pub(crate) fn open_observable(
        &self,
        parent: Option<&Observable>,
        name: &str,
        icon: &str,
        request: Option<serde_json::Value>,
    ) -> Option<Observable> {
        let observer = self.observer.as_ref()?;
        let fresh = observer.new_observable();
        let mut obs = match parent {
            Some(parent) => parent.child(fresh.id, name, icon),
            None => Observable {
                agent: self.name.clone(),
                name: name.to_string(),
                icon: icon.to_string(),
                ..fresh
            },
        };
        obs.creation = Some(Creation {
            at: Some(Utc::now()),
            request,
        });
        observer.update(obs.clone());
        Some(obs)
    }

    pub(crate) fn publish(&self, obs: &Observable) {
        if let Some(observer) = &self.observer {
            observer.update(obs.clone());
        }
    }

    pub(crate) fn close_observable(&self, obs: Option<Observable>, error: Option<String>) {
        if let (Some(observer), Some(mut obs)) = (&self.observer, obs) {
            obs.completion = Some(Completion {
                error,
                ..Default::default()
            });
            observer.update(obs);
        }
    }
}

/// "User asked / Assistant answered" of the last exchange, if both are long enough.
fn exchange_summary(conversation: &[Message]) -> Option<String> {
    let user = conversation.iter().rev().find(|m| m.role == Role::User)?;
    let assistant = conversation
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant && !m.content.is_empty())?;
    if user.content.len() < MIN_MEMORY_LEN || assistant.content.len() < MIN_MEMORY_LEN {
        return None;
    }
    Some(format!(
        "User asked: {}\nAssistant answered: {}",
        user.content, assistant.content
    ))
}
