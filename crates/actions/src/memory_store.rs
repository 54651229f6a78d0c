//! Knowledge-base store: lets the agent remember something for later.

use async_trait::async_trait;
use autoclaw_core::{
    Action, ActionContext, ActionDefinition, ActionError, ActionParams, ActionResult, ParamSpec,
    RagDb,
};
use std::sync::Arc;

pub const NAME: &str = "add_to_memory";

pub struct MemoryStoreAction {
    rag: Arc<dyn RagDb>,
}

impl MemoryStoreAction {
    pub fn new(rag: Arc<dyn RagDb>) -> Self {
        Self { rag }
    }
}

#[async_trait]
impl Action for MemoryStoreAction {
    fn definition(&self) -> ActionDefinition {
        ActionDefinition::new(NAME, "Store a fact in your long-term memory.")
            .required_param("content", ParamSpec::string("The fact to remember"))
    }

    async fn run(&self, _ctx: &ActionContext, params: ActionParams) -> Result<ActionResult, ActionError> {
        let content = params
            .get_str("content")
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ActionError::InvalidArguments("Missing 'content' argument".into()))?;

        self.rag
            .store(content)
            .await
            .map_err(|e| ActionError::ExecutionFailed {
                action: NAME.into(),
                reason: e.to_string(),
            })?;

        Ok(ActionResult::text(format!("Stored in memory: {content}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclaw_memory::InMemoryKnowledge;

    #[tokio::test]
    async fn stores_content() {
        let rag = Arc::new(InMemoryKnowledge::new());
        let action = MemoryStoreAction::new(rag.clone());
        action
            .run(&ActionContext::default(), ActionParams::new().with("content", "Ada likes tea"))
            .await
            .unwrap();
        assert_eq!(rag.count().await, 1);
    }

    #[tokio::test]
    async fn blank_content_rejected() {
        let rag = Arc::new(InMemoryKnowledge::new());
        let action = MemoryStoreAction::new(rag.clone());
        let err = action
            .run(&ActionContext::default(), ActionParams::new().with("content", "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidArguments(_)));
        assert_eq!(rag.count().await, 0);
    }
}
