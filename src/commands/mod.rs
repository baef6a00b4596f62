//! CLI command implementations.
//!
//! Each submodule implements one swea subcommand. Output formatting lives in
//! [`format`] as pure functions so it can be tested without Docker.

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::Config;
use crate::sandbox::{DockerRuntime, SandboxError, SandboxManager};
use crate::templates::Templates;

pub(crate) mod format;
pub mod manage;
pub mod run;
pub mod script;
pub mod status;

/// Sandbox selection shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Loads `swea.toml` from the current directory and applies overrides.
pub(crate) fn load_config(target: &Target) -> Result<Config> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config = Config::load(&cwd)?.with_overrides(target.name.clone(), target.image.clone());
    debug!(
        "Using sandbox {} ({})",
        config.sandbox.name, config.sandbox.image
    );
    Ok(config)
}

/// Connects to Docker and builds a manager for the configured sandbox.
pub(crate) async fn open_manager(config: &Config) -> Result<SandboxManager<DockerRuntime>> {
    let templates = Templates::load(&config.templates)?;
    let runtime = DockerRuntime::connect().await?;
    Ok(SandboxManager::new(
        runtime,
        config.sandbox_settings(),
        templates,
    ))
}

/// Wraps a failure to bring the sandbox up. A half-provisioned container
/// would be reused as is, so provisioning failures point at `swea destroy`.
pub(crate) fn prepare_failed(err: SandboxError, name: &str) -> anyhow::Error {
    let message = if err.is_provisioning_failure() {
        format!(
            "Failed to provision sandbox {name}; run `swea destroy` before retrying so it is provisioned again"
        )
    } else {
        format!("Failed to prepare sandbox {name}")
    };
    anyhow::Error::new(err).context(message)
}
