//! Commands acting on an existing sandbox without creating one.

use anyhow::{bail, Context, Result};
use colored::Colorize;

use super::{load_config, open_manager, Target};

/// Re-syncs workspace, agent config and `AGENTS.md` into the running sandbox.
pub async fn reinit(target: &Target) -> Result<()> {
    let config = load_config(target)?;
    let mut manager = open_manager(&config).await?;

    if manager.attach().await?.is_none() {
        bail!(
            "No sandbox named {}; run `swea run` to create it",
            config.sandbox.name
        );
    }

    manager
        .reinitialize()
        .await
        .context("Failed to re-initialize sandbox")?;
    manager.detach();

    println!("{} Sandbox {} re-initialized", "✅".green(), config.sandbox.name.cyan());
    Ok(())
}

/// Stops the sandbox, keeping it for reuse.
pub async fn stop(target: &Target) -> Result<()> {
    let config = load_config(target)?;
    let mut manager = open_manager(&config).await?;

    if manager.attach().await?.is_none() {
        println!("{} No sandbox named {}", "ℹ".blue(), config.sandbox.name);
        return Ok(());
    }

    manager.release().await.context("Failed to stop sandbox")?;
    println!("{} Sandbox {} stopped", "✅".green(), config.sandbox.name.cyan());
    Ok(())
}

/// Removes the sandbox container. The workspace volume survives.
pub async fn destroy(target: &Target) -> Result<()> {
    let config = load_config(target)?;
    let mut manager = open_manager(&config).await?;

    if manager.attach().await?.is_none() {
        println!("{} No sandbox named {}", "ℹ".blue(), config.sandbox.name);
        return Ok(());
    }

    manager.destroy().await.context("Failed to remove sandbox")?;
    println!(
        "{} Sandbox {} removed (volume {} kept)",
        "✅".green(),
        config.sandbox.name.cyan(),
        manager.settings().volume_name().dimmed()
    );
    Ok(())
}
