//! Prompt templates.

use autoclaw_core::{ActionDefinition, AgentInternalState, Character};

pub(crate) const GAP_SUMMARY_PREFIX: &str = "The previous answer did not fully satisfy the goal.";
pub(crate) const STOPPED_BY_CALLBACK: &str = "stopped by callback";

/// Instruction appended before picking the first action of a turn.
pub(crate) fn pick(defs: &[ActionDefinition], permanent_goal: Option<&str>) -> String {
    let mut out = String::from(
        "You are an AI agent that can use tools. Decide the best next step to satisfy the request above.\n\
         Pick exactly one tool, or answer directly if no tool is needed.\n\nAvailable tools:\n",
    );
    for def in defs {
        out.push_str(&format!("- {}: {}\n", def.name, def.description));
    }
    if let Some(goal) = permanent_goal {
        out.push_str(&format!("\nYour permanent goal is: {goal}\n"));
    }
    out
}

/// Instruction appended after an action ran.
pub(crate) fn reevaluation(defs: &[ActionDefinition]) -> String {
    let mut out = String::from(
        "You have just run a tool; its result is the last message above.\n\
         If the request is fully handled, reply to the user. Otherwise pick the next tool.\n\nAvailable tools:\n",
    );
    for def in defs {
        out.push_str(&format!("- {}: {}\n", def.name, def.description));
    }
    out
}

pub(crate) const REASONING: &str = "Think step by step about the conversation above and describe \
    what should be done next and why. Do not answer the user yet.";

pub(crate) fn pick_tool(reasoning: &str) -> String {
    format!(
        "Based on this reasoning, pick the tool to use next, or \"none\" if the user should just get an answer:\n{reasoning}"
    )
}

pub(crate) fn parameters(action: &str, reasoning: &str) -> String {
    if reasoning.is_empty() {
        format!("Generate the arguments for the `{action}` tool based on the conversation above.")
    } else {
        format!(
            "Generate the arguments for the `{action}` tool based on the conversation above.\nReasoning: {reasoning}"
        )
    }
}

pub(crate) const REPLY: &str = "Write the final answer to the user based on the conversation above. \
    Answer directly, without mentioning tools.";

pub(crate) fn polish(draft: &str) -> String {
    format!(
        "Write the final answer to the user based on the conversation above and this draft:\n{draft}"
    )
}

pub(crate) fn subtask(index: usize, total: usize, goal: &str, reasoning: &str) -> String {
    format!(
        "You are executing step {} of {} of the plan \"{goal}\".\nThis step: {reasoning}",
        index + 1,
        total
    )
}

pub(crate) fn hud(
    character: Option<&Character>,
    permanent_goal: Option<&str>,
    state: &AgentInternalState,
) -> String {
    let mut out = String::new();
    if let Some(c) = character {
        out.push_str("You are the following character:\n");
        out.push_str(&c.describe());
        out.push_str("\n\n");
    }
    if let Some(goal) = permanent_goal {
        out.push_str(&format!("Your permanent goal is: {goal}\n\n"));
    }
    out.push_str("This is your current state:\n");
    out.push_str(&state.describe());
    out
}

pub(crate) fn knowledge(hits: &[String]) -> String {
    let mut out = String::from("Given the user input you have the following in memory:\n");
    for hit in hits {
        out.push_str(&format!("- {hit}\n"));
    }
    out
}

pub(crate) const DESCRIBE_IMAGE: &str = "Describe this image in detail.";

pub(crate) fn image_description(description: &str) -> String {
    format!("The user shared an image, which can be described as: {description}")
}

pub(crate) fn state_updated(state: &AgentInternalState) -> String {
    format!("Internal state updated:\n{}", state.describe())
}

/// Prompt for autonomous runs.
pub(crate) fn self_run(permanent_goal: Option<&str>) -> String {
    let mut out = String::from(
        "You are running autonomously, without a user request. Review your internal state and \
         decide whether there is something worth doing right now. If not, stop.",
    );
    if let Some(goal) = permanent_goal {
        out.push_str(&format!("\nYour permanent goal is: {goal}"));
    }
    out
}

pub(crate) fn identity(guidance: Option<&str>) -> String {
    match guidance {
        Some(g) => format!("Generate a random character for an AI agent. Guidance: {g}"),
        None => "Generate a random character for an AI agent.".into(),
    }
}

pub(crate) const EXTRACT_GOAL: &str = "Extract the goal of the user's request from the conversation \
    above, with any constraints and relevant context.";

pub(crate) fn evaluate_goal(goal: &str, constraints: &[String]) -> String {
    let mut out = format!(
        "Evaluate whether the conversation above satisfies this goal: {goal}\n"
    );
    if !constraints.is_empty() {
        out.push_str("Constraints:\n");
        for c in constraints {
            out.push_str(&format!("- {c}\n"));
        }
    }
    out.push_str("If it does not, list the gaps that remain.");
    out
}

pub(crate) fn gap_summary(gaps: &[String], reasoning: &str) -> String {
    let mut out = format!("{GAP_SUMMARY_PREFIX} Remaining gaps:\n");
    for gap in gaps {
        out.push_str(&format!("- {gap}\n"));
    }
    if !reasoning.is_empty() {
        out.push_str(&format!("Evaluator notes: {reasoning}\n"));
    }
    out.push_str("Continue working until the goal is satisfied.");
    out
}
