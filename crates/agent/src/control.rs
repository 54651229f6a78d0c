//! Control actions interpreted by the engine itself.
//!
//! These are offered to the model next to ordinary actions but never
//! dispatched through [`Action::run`]. [`Toolbox::resolve`] is the only
//! place a tool name is mapped back to either kind.

use autoclaw_core::{
    Action, ActionDefinition, ActionParams, ActionSet, AgentInternalState, ParamSpec,
    ToolDefinition,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// Terminate with a user-facing message.
    Reply,
    /// Finish without replying.
    Stop,
    /// Expand into an ordered list of subtasks.
    Plan,
    /// Replace the agent's internal state.
    State,
    /// Start a conversation with subscribers.
    NewConversation,
}

impl ControlAction {
    pub const ALL: [ControlAction; 5] = [
        ControlAction::Reply,
        ControlAction::Stop,
        ControlAction::Plan,
        ControlAction::State,
        ControlAction::NewConversation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ControlAction::Reply => "reply",
            ControlAction::Stop => "stop",
            ControlAction::Plan => "plan",
            ControlAction::State => "update_state",
            ControlAction::NewConversation => "new_conversation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// `plannable` lists the action names a plan subtask may use.
    pub fn definition(self, plannable: &[String]) -> ActionDefinition {
        match self {
            ControlAction::Reply => ActionDefinition::new(
                self.name(),
                "Use this tool to reply to the user once you have everything you need.",
            )
            .required_param("message", ParamSpec::string("The message to reply with")),
            ControlAction::Stop => ActionDefinition::new(
                self.name(),
                "Use this tool to stop the current task when there is nothing left to do.",
            ),
            ControlAction::Plan => ActionDefinition::new(
                self.name(),
                "Plan complex tasks as a sequence of subtasks, each carried out by one tool.",
            )
            .with_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "goal": { "type": "string", "description": "The goal of the plan" },
                    "subtasks": {
                        "type": "array",
                        "description": "The subtasks to carry out, in order",
                        "items": {
                            "type": "object",
                            "properties": {
                                "action": { "type": "string", "enum": plannable, "description": "The tool to use" },
                                "reasoning": { "type": "string", "description": "What this step should achieve" }
                            },
                            "required": ["action", "reasoning"]
                        }
                    }
                },
                "required": ["goal", "subtasks"]
            })),
            ControlAction::State => ActionDefinition::new(
                self.name(),
                "Update your internal state: what you are doing, what comes next, your goal and memories.",
            )
            .with_schema(AgentInternalState::schema()),
            ControlAction::NewConversation => ActionDefinition::new(
                self.name(),
                "Start a new conversation with the user by sending them a message.",
            )
            .required_param("message", ParamSpec::string("The message to start the conversation with")),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct ReplyPayload {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct PlanPayload {
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub subtasks: Vec<PlanSubtask>,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct PlanSubtask {
    pub action: String,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct NewConversationPayload {
    pub message: String,
}

/// Decode a control payload; failures are fatal to the job.
pub(crate) fn payload<T: serde::de::DeserializeOwned>(
    control: ControlAction,
    params: &ActionParams,
) -> Result<T, AgentError> {
    params
        .unmarshal()
        .map_err(|e| AgentError::invalid_payload(control.name(), e))
}

/// Either kind of choosable tool.
#[derive(Clone)]
pub enum Chosen {
    Control(ControlAction),
    Action(Arc<dyn Action>),
}

impl Chosen {
    pub fn name(&self) -> String {
        match self {
            Chosen::Control(c) => c.name().to_string(),
            Chosen::Action(a) => a.definition().name,
        }
    }

    pub fn is(&self, control: ControlAction) -> bool {
        matches!(self, Chosen::Control(c) if *c == control)
    }
}

impl std::fmt::Debug for Chosen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Chosen::Control(c) => write!(f, "Control({})", c.name()),
            Chosen::Action(a) => write!(f, "Action({})", a.definition().name),
        }
    }
}

/// Everything the model may pick from during one job.
pub(crate) struct Toolbox {
    pub actions: ActionSet,
    pub controls: Vec<ControlAction>,
}

impl Toolbox {
    pub fn plannable(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter(|a| a.plannable())
            .map(|a| a.definition().name)
            .collect()
    }

    pub fn resolve(&self, name: &str) -> Option<Chosen> {
        if let Some(control) = ControlAction::from_name(name)
            && self.controls.contains(&control)
        {
            return Some(Chosen::Control(control));
        }
        self.actions.find(name).map(Chosen::Action)
    }

    /// Resolve a plan subtask: ordinary plannable actions only.
    pub fn resolve_plannable(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.find(name).filter(|a| a.plannable())
    }

    pub fn definition_of(&self, chosen: &Chosen) -> ActionDefinition {
        match chosen {
            Chosen::Control(c) => c.definition(&self.plannable()),
            Chosen::Action(a) => a.definition(),
        }
    }

    pub fn definitions(&self) -> Vec<ActionDefinition> {
        let plannable = self.plannable();
        let mut defs = self.actions.definitions();
        defs.extend(self.controls.iter().map(|c| c.definition(&plannable)));
        defs
    }

    pub fn tools(&self) -> Vec<ToolDefinition> {
        self.definitions().iter().map(ActionDefinition::to_tool).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.definitions().into_iter().map(|d| d.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use autoclaw_core::{ActionContext, ActionError, ActionResult};

    struct Fixed(&'static str, bool);

    #[async_trait]
    impl Action for Fixed {
        fn definition(&self) -> ActionDefinition {
            ActionDefinition::new(self.0, "fixed")
        }
        async fn run(&self, _: &ActionContext, _: ActionParams) -> Result<ActionResult, ActionError> {
            Ok(ActionResult::text(self.0))
        }
        fn plannable(&self) -> bool {
            self.1
        }
    }

    fn toolbox(controls: Vec<ControlAction>) -> Toolbox {
        let mut actions = ActionSet::new();
        actions.register(Arc::new(Fixed("search", true)));
        actions.register(Arc::new(Fixed("secret", false)));
        Toolbox { actions, controls }
    }

    #[test]
    fn names_round_trip() {
        for c in ControlAction::ALL {
            assert_eq!(ControlAction::from_name(c.name()), Some(c));
        }
        assert_eq!(ControlAction::from_name("search"), None);
    }

    #[test]
    fn resolve_respects_enabled_controls() {
        let tb = toolbox(vec![ControlAction::Reply]);
        assert!(matches!(tb.resolve("reply"), Some(Chosen::Control(ControlAction::Reply))));
        assert!(tb.resolve("plan").is_none());
        assert!(matches!(tb.resolve("search"), Some(Chosen::Action(_))));
        assert!(tb.resolve("missing").is_none());
    }

    #[test]
    fn plan_schema_lists_only_plannable_actions() {
        let tb = toolbox(vec![ControlAction::Reply, ControlAction::Plan]);
        let def = tb.definition_of(&Chosen::Control(ControlAction::Plan));
        let schema = def.parameters_schema();
        let allowed = &schema["properties"]["subtasks"]["items"]["properties"]["action"]["enum"];
        assert_eq!(allowed, &serde_json::json!(["search"]));
        assert!(tb.resolve_plannable("secret").is_none());
    }

    #[test]
    fn tools_include_controls_after_actions() {
        let tb = toolbox(vec![ControlAction::Reply, ControlAction::Stop]);
        assert_eq!(tb.names(), vec!["search", "secret", "reply", "stop"]);
    }

    #[test]
    fn bad_payload_is_invalid_payload_error() {
        let params = ActionParams::new().with("subtasks", "not a list");
        let err = payload::<PlanPayload>(ControlAction::Plan, &params).unwrap_err();
        assert!(matches!(err, AgentError::InvalidPayload { .. }));
    }
}
