//! The agent's self-reported HUD.

use serde::{Deserialize, Serialize};

/// Mutated only through the `update_state` control action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentInternalState {
    #[serde(default)]
    pub now_doing: String,
    #[serde(default)]
    pub do_next: String,
    #[serde(default)]
    pub done_history: Vec<String>,
    #[serde(default)]
    pub memories: Vec<String>,
    #[serde(default)]
    pub goal: String,
}

impl AgentInternalState {
    pub fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "now_doing": { "type": "string", "description": "What you are doing now" },
                "do_next": { "type": "string", "description": "What you are going to do next" },
                "done_history": { "type": "array", "items": { "type": "string" }, "description": "What you have done" },
                "memories": { "type": "array", "items": { "type": "string" }, "description": "Things to remember" },
                "goal": { "type": "string", "description": "Your current goal" }
            },
            "required": ["now_doing", "do_next", "done_history", "memories", "goal"]
        })
    }

    /// Rendering used by the HUD prompt.
    pub fn describe(&self) -> String {
        let mut out = format!(
            "Current goal: {}\nNow doing: {}\nDo next: {}",
            self.goal, self.now_doing, self.do_next
        );
        if !self.done_history.is_empty() {
            out.push_str("\nDone history:");
            for item in &self.done_history {
                out.push_str(&format!("\n- {item}"));
            }
        }
        if !self.memories.is_empty() {
            out.push_str("\nMemories:");
            for item in &self.memories {
                out.push_str(&format!("\n- {item}"));
            }
        }
        out
    }
}
