use anyhow::{bail, Context, Result};
use std::io::Read;
use std::time::Duration;
use tracing::info;

use super::format::{format_ready, format_result};
use super::{load_config, open_manager, prepare_failed, Target};

/// Joins the prompt words, reading stdin when none were given.
fn resolve_prompt(words: &[String]) -> Result<String> {
    let prompt = if words.is_empty() {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read prompt from stdin")?;
        buf
    } else {
        words.join(" ")
    };

    let prompt = prompt.trim().to_string();
    if prompt.is_empty() {
        bail!("Prompt is empty");
    }
    Ok(prompt)
}

/// Runs the agent on a prompt inside the sandbox. Returns whether it finished
/// without getting stuck.
pub async fn run(
    target: &Target,
    prompt: &[String],
    timeout_secs: Option<u64>,
    workdir: Option<String>,
) -> Result<bool> {
    let prompt = resolve_prompt(prompt)?;
    let config = load_config(target)?;
    let mut manager = open_manager(&config).await?;

    let mut session = manager
        .session()
        .await
        .map_err(|e| prepare_failed(e, &config.sandbox.name))?;
    if let Some(instance) = session.instance() {
        println!("{}", format_ready(instance));
    }

    let result = session
        .codex_exec(
            &prompt,
            workdir.as_deref(),
            timeout_secs.map(Duration::from_secs),
        )
        .await?;
    drop(session);

    println!();
    print!("{}", format_result(&result, false));
    info!("Sandbox {} left running for reuse", config.sandbox.name);

    Ok(result.success())
}
