//! `autoclaw run`: start every agent and chat on stdin.
//!
//! Agents keep their periodic self-runs going in the background; lines read
//! from stdin become jobs for the selected agent. Conversations an agent
//! starts on its own are printed as they arrive.

use autoclaw_agent::{Job, JobOutput};
use autoclaw_config::AppConfig;
use autoclaw_core::Message;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::ask::print_trail;
use super::{CliResult, build_pool};

pub async fn run(config: &AppConfig, agent: Option<String>) -> CliResult {
    let pool = build_pool(config).await?;
    let name = match agent {
        Some(name) => name,
        None => pool.names().into_iter().next().unwrap_or_default(),
    };
    let target = pool
        .get(&name)
        .ok_or_else(|| format!("Unknown agent '{name}' (configured: {})", pool.names().join(", ")))?;

    for agent_name in pool.names() {
        if let Some(agent) = pool.get(&agent_name) {
            agent.subscribe_conversations(move |msg: &Message| {
                println!("\n  [{agent_name} says] {}", msg.content);
            });
        }
    }

    pool.start_all();
    info!(agents = ?pool.names(), chatting_with = %name, "Agents running");
    println!("  Chatting with '{name}'. Type 'exit' or press Ctrl+C to quit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<Message> = Vec::new();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let text = line.trim();
        if text.eq_ignore_ascii_case("exit") {
            break;
        }
        if text.is_empty() {
            continue;
        }

        let cancel = CancellationToken::new();
        let job = Job::new()
            .with_text(text)
            .with_conversation_history(history.clone())
            .with_cancellation(cancel.clone());
        let out: JobOutput = tokio::select! {
            out = target.ask(job) => out,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                break;
            }
        };

        print_trail(&out);
        match &out.error {
            Some(err) => eprintln!("  [Error] {err}"),
            None => {
                for line in out.response.lines() {
                    println!("  {name} > {line}");
                }
                history.push(Message::user(text));
                history.push(Message::assistant(out.response.clone()));
            }
        }
        println!();
    }

    println!("\n  Stopping agents...");
    pool.stop_all().await;
    Ok(())
}
