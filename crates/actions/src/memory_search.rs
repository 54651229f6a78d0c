//! Knowledge-base search: lets the agent look things up on demand.

use async_trait::async_trait;
use autoclaw_core::{
    Action, ActionContext, ActionDefinition, ActionError, ActionParams, ActionResult, ParamKind,
    ParamSpec, RagDb,
};
use serde::Deserialize;
use std::sync::Arc;

pub const NAME: &str = "search_memory";

pub struct MemorySearchAction {
    rag: Arc<dyn RagDb>,
}

impl MemorySearchAction {
    pub fn new(rag: Arc<dyn RagDb>) -> Self {
        Self { rag }
    }
}

#[derive(Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    5
}

#[async_trait]
impl Action for MemorySearchAction {
    fn definition(&self) -> ActionDefinition {
        ActionDefinition::new(
            NAME,
            "Search your long-term memory for relevant facts and past conversations.",
        )
        .required_param("query", ParamSpec::string("What to search for"))
        .param(
            "limit",
            ParamSpec::new(ParamKind::Integer, "Maximum number of results (default 5)"),
        )
    }

    async fn run(&self, _ctx: &ActionContext, params: ActionParams) -> Result<ActionResult, ActionError> {
        let p: SearchParams = params
            .unmarshal()
            .map_err(|e| ActionError::InvalidArguments(e.to_string()))?;

        let hits = self
            .rag
            .search(&p.query, p.limit.clamp(1, 50))
            .await
            .map_err(|e| ActionError::ExecutionFailed {
                action: NAME.into(),
                reason: e.to_string(),
            })?;

        if hits.is_empty() {
            return Ok(ActionResult::text(format!("No memories found matching '{}'.", p.query)));
        }

        let mut result = ActionResult::text(
            hits.iter()
                .map(|h| format!("- {h}"))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        result.metadata.insert("hits".into(), hits.len().into());
        Ok(result)
    }
}
