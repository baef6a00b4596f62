use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::format::format_result;
use super::{load_config, open_manager, prepare_failed, Target};
use crate::sandbox::{Command, ExecOptions};

/// Parses `KEY=VALUE` pairs from `--env`.
pub(crate) fn parse_env(pairs: &[String]) -> Result<HashMap<String, String>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => bail!("Invalid environment variable (expected KEY=VALUE): {pair}"),
        })
        .collect()
}

/// One argument is run through the shell; several are passed as argv.
pub(crate) fn to_command(words: &[String]) -> Command {
    match words {
        [single] => Command::from(single),
        many => Command::from(many.to_vec()),
    }
}

fn exec_options(workdir: Option<String>, env: &[String], user: Option<String>) -> Result<ExecOptions> {
    let mut options = ExecOptions::new();
    if let Some(dir) = workdir {
        options = options.working_dir(dir);
    }
    if !env.is_empty() {
        options = options.env(parse_env(env)?);
    }
    if let Some(user) = user {
        options = options.user(user);
    }
    Ok(options)
}

/// Runs a one-off command in the sandbox.
pub async fn exec(
    target: &Target,
    command: &[String],
    workdir: Option<String>,
    env: &[String],
    user: Option<String>,
) -> Result<bool> {
    let options = exec_options(workdir, env, user)?;
    let config = load_config(target)?;
    let mut manager = open_manager(&config).await?;
    let session = manager
        .session()
        .await
        .map_err(|e| prepare_failed(e, &config.sandbox.name))?;

    let result = session.execute_with(to_command(command), &options).await?;
    print!("{}", format_result(&result, true));
    Ok(result.success())
}

/// Copies a host script into the sandbox and runs it.
pub async fn script(
    target: &Target,
    file: &Path,
    interpreter: &str,
    workdir: Option<String>,
    env: &[String],
) -> Result<bool> {
    let body = fs::read_to_string(file)
        .with_context(|| format!("Failed to read script: {}", file.display()))?;
    let options = exec_options(workdir, env, None)?;
    let config = load_config(target)?;
    let mut manager = open_manager(&config).await?;
    let session = manager
        .session()
        .await
        .map_err(|e| prepare_failed(e, &config.sandbox.name))?;

    let result = session.execute_script(&body, interpreter, &options).await?;
    print!("{}", format_result(&result, true));
    Ok(result.success())
}
