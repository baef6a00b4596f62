//! One-shot command execution inside the sandbox.

use std::collections::HashMap;
use tracing::{debug, warn};

use super::lifecycle::{Instance, SandboxManager};
use super::result::ExecutionResult;
use super::runtime::{ContainerRuntime, ExecRequest};
use super::SandboxError;

/// User commands run as unless told otherwise.
pub const DEFAULT_USER: &str = "root";

/// A command to run in the sandbox.
///
/// `Shell` strings go through `/bin/bash -c`; `Argv` vectors run as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Shell(String),
    Argv(Vec<String>),
}

impl Command {
    pub fn into_argv(self) -> Vec<String> {
        match self {
            Self::Shell(line) => vec!["/bin/bash".to_string(), "-c".to_string(), line],
            Self::Argv(argv) => argv,
        }
    }
}

impl From<&str> for Command {
    fn from(line: &str) -> Self {
        Self::Shell(line.to_string())
    }
}

impl From<String> for Command {
    fn from(line: String) -> Self {
        Self::Shell(line)
    }
}

impl From<&String> for Command {
    fn from(line: &String) -> Self {
        Self::Shell(line.clone())
    }
}

impl From<Vec<String>> for Command {
    fn from(argv: Vec<String>) -> Self {
        Self::Argv(argv)
    }
}

impl From<Vec<&str>> for Command {
    fn from(argv: Vec<&str>) -> Self {
        Self::Argv(argv.into_iter().map(String::from).collect())
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shell(line) => write!(f, "{line}"),
            Self::Argv(argv) => write!(f, "{}", shell_words::join(argv)),
        }
    }
}

/// Per-call overrides for [`SandboxManager::execute_with`].
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub working_dir: Option<String>,
    pub env: Option<HashMap<String, String>>,
    pub user: Option<String>,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    fn to_request(&self, instance: &Instance, argv: Vec<String>) -> ExecRequest {
        ExecRequest {
            argv,
            working_dir: Some(
                self.working_dir
                    .clone()
                    .unwrap_or_else(|| instance.working_dir.clone()),
            ),
            env: self.env.clone(),
            user: Some(self.user.clone().unwrap_or_else(|| DEFAULT_USER.to_string())),
        }
    }
}

/// Generates a unique path for a temporary script inside the sandbox.
pub(crate) fn script_path() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("/tmp/script_{}.sh", &id[..8])
}

impl<R: ContainerRuntime> SandboxManager<R> {
    /// Runs `command` with default options and waits for it to finish.
    pub async fn execute(
        &self,
        command: impl Into<Command>,
    ) -> Result<ExecutionResult, SandboxError> {
        self.execute_with(command, &ExecOptions::default()).await
    }

    /// Runs `command` and waits for it to finish.
    ///
    /// Fails only when the sandbox is not attached or not running. Runtime
    /// errors while launching the command come back as a failed result.
    pub async fn execute_with(
        &self,
        command: impl Into<Command>,
        options: &ExecOptions,
    ) -> Result<ExecutionResult, SandboxError> {
        let instance = self.ensure_running().await?;
        let command = command.into();
        debug!("Executing command: {}", command);

        let request = options.to_request(instance, command.into_argv());

        match self.runtime.exec(&instance.id, &request).await {
            Ok(output) => Ok(ExecutionResult::new(
                output.exit_code,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            )),
            Err(e) => {
                warn!("Failed to run command in {}: {}", instance.name, e);
                Ok(ExecutionResult::launch_failure(e.to_string()))
            }
        }
    }

    /// Writes `contents` verbatim to `path` inside the sandbox.
    pub async fn write_file(
        &self,
        path: &str,
        contents: &str,
    ) -> Result<ExecutionResult, SandboxError> {
        self.execute(vec![
            "/bin/sh",
            "-c",
            "printf '%s' \"$1\" > \"$2\"",
            "sh",
            contents,
            path,
        ])
        .await
    }

    /// Runs `body` as a temporary script under `interpreter`.
    ///
    /// The script file is always removed afterwards; the returned result is
    /// that of the first failing step or of the script itself.
    pub async fn execute_script(
        &self,
        body: &str,
        interpreter: &str,
        options: &ExecOptions,
    ) -> Result<ExecutionResult, SandboxError> {
        let path = script_path();
        let outcome = self.run_script(&path, body, interpreter, options).await;

        match self
            .execute(format!("rm -f {}", shell_words::quote(&path)))
            .await
        {
            Ok(cleanup) if cleanup.success() => debug!("Removed {}", path),
            Ok(cleanup) => warn!("Failed to remove {}: {}", path, cleanup.stderr()),
            Err(e) => warn!("Failed to remove {}: {}", path, e),
        }

        outcome
    }

    async fn run_script(
        &self,
        path: &str,
        body: &str,
        interpreter: &str,
        options: &ExecOptions,
    ) -> Result<ExecutionResult, SandboxError> {
        let mut script = body.to_string();
        if !script.ends_with('\n') {
            script.push('\n');
        }

        let created = self.write_file(path, &script).await?;
        if !created.success() {
            return Ok(created);
        }

        let quoted = shell_words::quote(path);
        let chmod = self.execute(format!("chmod +x {quoted}")).await?;
        if !chmod.success() {
            return Ok(chmod);
        }

        self.execute_with(format!("{interpreter} {quoted}"), options)
            .await
    }
}
