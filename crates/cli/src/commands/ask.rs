//! `autoclaw ask`: one question, one answer.

use autoclaw_agent::{Job, JobOutput};
use autoclaw_config::AppConfig;

use super::{CliResult, build_pool};

pub async fn run(config: &AppConfig, agent: &str, message: &str) -> CliResult {
    let pool = build_pool(config).await?;
    let target = pool
        .get(agent)
        .ok_or_else(|| format!("Unknown agent '{agent}' (configured: {})", pool.names().join(", ")))?;

    pool.start_all();
    eprint!("  Thinking...");
    let out = target.ask(Job::new().with_text(message)).await;
    eprint!("\r              \r");
    pool.stop_all().await;

    print_trail(&out);
    if let Some(err) = &out.error {
        return Err(format!("Job failed: {err}").into());
    }
    println!("{}", out.response);
    Ok(())
}

/// One line per executed step.
pub(crate) fn print_trail(out: &JobOutput) {
    for step in &out.state {
        eprintln!(
            "  [{}] {} -> {}",
            step.current.action.name,
            step.current.params,
            first_line(&step.result.result)
        );
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
