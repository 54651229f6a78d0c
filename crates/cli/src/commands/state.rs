//! `autoclaw state`: print what an agent has persisted.

use autoclaw_agent::{FileStateStore, StateStore};
use autoclaw_config::AppConfig;

use super::CliResult;

pub async fn run(config: &AppConfig, agent: &str) -> CliResult {
    if config.agent(agent).is_none() {
        return Err(format!("Unknown agent '{agent}'").into());
    }
    let store = FileStateStore::new(config.state_path());
    print!("{}", render(&store, agent)?);
    Ok(())
}

fn render(store: &FileStateStore, agent: &str) -> CliResult<String> {
    let mut out = format!("Agent: {agent}\n\n");
    match store.load_state(agent) {
        Some(state) => out.push_str(&format!("{}\n", state.describe())),
        None => out.push_str("(no internal state persisted yet)\n"),
    }
    out.push('\n');
    match store.load_character(agent) {
        Some(character) => out.push_str(&format!(
            "Character:\n{}\n",
            serde_json::to_string_pretty(&character)?
        )),
        None => out.push_str("(no character)\n"),
    }
    Ok(out)
}
