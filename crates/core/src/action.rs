//! Action trait: the abstraction over agent capabilities.
//!
//! Actions are what give an agent the ability to act in the world: search
//! its knowledge base, fetch a URL, talk to an external service. The engine
//! only ever looks at an action's [`ActionDefinition`] name; everything else
//! is opaque.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::ActionError;
use crate::provider::ToolDefinition;

/// JSON type of a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

/// Declaration of one named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub kind: ParamKind,

    #[serde(default)]
    pub description: String,

    /// Allowed values, rendered as a JSON-schema `enum`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    /// Element type for `Array` parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ParamKind>,
}

impl ParamSpec {
    pub fn new(kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            enum_values: Vec::new(),
            items: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(ParamKind::String, description)
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_items(mut self, items: ParamKind) -> Self {
        self.items = Some(items);
        self
    }

    fn to_schema(&self) -> serde_json::Value {
        let mut schema = serde_json::Map::new();
        schema.insert("type".into(), serde_json::to_value(self.kind).unwrap_or_default());
        if !self.description.is_empty() {
            schema.insert("description".into(), self.description.clone().into());
        }
        if !self.enum_values.is_empty() {
            schema.insert("enum".into(), self.enum_values.clone().into());
        }
        if let Some(items) = self.items {
            schema.insert(
                "items".into(),
                serde_json::json!({ "type": serde_json::to_value(items).unwrap_or_default() }),
            );
        }
        serde_json::Value::Object(schema)
    }
}

/// The immutable contract an action exposes to the engine and the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Unique, stable identifier. Used for equality and tool selection.
    pub name: String,

    pub description: String,

    #[serde(default)]
    pub properties: BTreeMap<String, ParamSpec>,

    #[serde(default)]
    pub required: Vec<String>,

    /// Raw JSON schema overriding `properties` for nested parameter shapes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

impl ActionDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: BTreeMap::new(),
            required: Vec::new(),
            schema: None,
        }
    }

    /// Add an optional parameter.
    pub fn param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.properties.insert(name.into(), spec);
        self
    }

    /// Add a required parameter.
    pub fn required_param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.insert(name, spec);
        self
    }

    /// Use a hand-written JSON schema for the parameters.
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// JSON schema of the parameters object.
    pub fn parameters_schema(&self) -> serde_json::Value {
        if let Some(schema) = &self.schema {
            return schema.clone();
        }
        let properties: serde_json::Map<String, serde_json::Value> = self
            .properties
            .iter()
            .map(|(name, spec)| (name.clone(), spec.to_schema()))
            .collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }

    /// Render as an LLM tool.
    pub fn to_tool(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Opaque JSON-keyed parameter bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionParams(pub serde_json::Map<String, serde_json::Value>);

impl ActionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse LLM tool-call arguments. Blank input is an empty bag.
    pub fn read(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }

    /// Build from any serializable value that renders as a JSON object.
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(value)?)
    }

    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(self.0.clone()))
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ActionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Output of a single action run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub result: String,

    /// Free-form data for connectors (generated URLs, images, ...).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ActionResult {
    pub fn text(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// What an action sees of the job running it.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    /// Cancelled when the job expires or the action is preempted.
    pub cancel: CancellationToken,

    /// Copy of the job metadata (e.g. `is_reminder`).
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ActionContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            metadata: serde_json::Map::new(),
        }
    }
}

/// The core Action trait.
#[async_trait]
pub trait Action: Send + Sync {
    /// Pure and cheap: called on every turn to build the tool list.
    fn definition(&self) -> ActionDefinition;

    /// Run the action. Errors are folded into the conversation by the engine.
    async fn run(&self, ctx: &ActionContext, params: ActionParams) -> Result<ActionResult, ActionError>;

    /// Whether the action may appear as a plan subtask.
    fn plannable(&self) -> bool {
        true
    }
}

/// An ordered set of actions with unique names.
#[derive(Clone, Default)]
pub struct ActionSet {
    actions: Vec<Arc<dyn Action>>,
}

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action. Replaces any existing action with the same name.
    pub fn register(&mut self, action: Arc<dyn Action>) {
        let name = action.definition().name;
        match self.actions.iter().position(|a| a.definition().name == name) {
            Some(idx) => self.actions[idx] = action,
            None => self.actions.push(action),
        }
    }

    pub fn extend(&mut self, other: &ActionSet) {
        for action in &other.actions {
            self.register(action.clone());
        }
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions
            .iter()
            .find(|a| a.definition().name == name)
            .cloned()
    }

    pub fn definitions(&self) -> Vec<ActionDefinition> {
        self.actions.iter().map(|a| a.definition()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.definition().name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Action>> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoAction {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl Action for EchoAction {
        fn definition(&self) -> ActionDefinition {
            ActionDefinition::new(self.name, "Echoes back the input")
                .required_param("text", ParamSpec::string("What to echo"))
        }

        async fn run(&self, _ctx: &ActionContext, params: ActionParams) -> Result<ActionResult, ActionError> {
            let text = params.get_str("text").unwrap_or(self.reply);
            Ok(ActionResult::text(text))
        }
    }

    #[test]
    fn register_replaces_same_name() {
        let mut set = ActionSet::new();
        set.register(Arc::new(EchoAction { name: "echo", reply: "a" }));
        set.register(Arc::new(EchoAction { name: "other", reply: "b" }));
        set.register(Arc::new(EchoAction { name: "echo", reply: "c" }));
        assert_eq!(set.names(), vec!["echo", "other"]);
    }

    #[tokio::test]
    async fn find_and_run() {
        let mut set = ActionSet::new();
        set.register(Arc::new(EchoAction { name: "echo", reply: "fallback" }));
        let action = set.find("echo").unwrap();
        let out = action
            .run(&ActionContext::default(), ActionParams::new().with("text", "hello"))
            .await
            .unwrap();
        assert_eq!(out.result, "hello");
        assert!(set.find("missing").is_none());
    }

    #[test]
    fn definition_renders_json_schema() {
        let def = ActionDefinition::new("search", "Search things")
            .required_param("query", ParamSpec::string("The query"))
            .param(
                "mode",
                ParamSpec::string("How to search").with_enum(["fast", "deep"]),
            );
        let tool = def.to_tool();
        assert_eq!(tool.name, "search");
        assert_eq!(tool.parameters["type"], "object");
        assert_eq!(tool.parameters["required"], serde_json::json!(["query"]));
        assert_eq!(
            tool.parameters["properties"]["mode"]["enum"],
            serde_json::json!(["fast", "deep"])
        );
    }

    #[test]
    fn raw_schema_wins() {
        let schema = serde_json::json!({"type": "object", "properties": {"x": {"type": "array"}}});
        let def = ActionDefinition::new("plan", "Plan").with_schema(schema.clone());
        assert_eq!(def.to_tool().parameters, schema);
    }

    #[test]
    fn params_read_and_display() {
        let params = ActionParams::read(r#"{"city":"boston"}"#).unwrap();
        assert_eq!(params.get_str("city"), Some("boston"));
        assert_eq!(params.to_string(), r#"{"city":"boston"}"#);
        assert_eq!(ActionParams::read(&params.to_string()).unwrap(), params);
    }

    #[test]
    fn params_read_rejects_malformed() {
        assert!(ActionParams::read("{not json").is_err());
        assert!(ActionParams::read("[1,2]").is_err());
        assert!(ActionParams::read("  ").unwrap().is_empty());
    }

    #[test]
    fn params_unmarshal_into_struct() {
        #[derive(Deserialize)]
        struct Query {
            query: String,
            #[serde(default)]
            limit: usize,
        }
        let params = ActionParams::new().with("query", "rust");
        let q: Query = params.unmarshal().unwrap();
        assert_eq!(q.query, "rust");
        assert_eq!(q.limit, 0);
    }
}
