//! Interactive, tty-backed execution with live output and stuck detection.

use futures_util::StreamExt;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::lifecycle::SandboxManager;
use super::liveness::{LivenessMonitor, StuckVerdict};
use super::result::ExecutionResult;
use super::runtime::{ContainerRuntime, ExecRequest};
use super::SandboxError;

/// Diagnostic returned as stderr when the agent is abandoned.
pub const STUCK_MESSAGE: &str = "Codex agent stuck.";

const PROMPT_LOG_LIMIT: usize = 100;

/// Everything an interactive session produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    pub output: String,
    pub verdict: StuckVerdict,
}

/// Escapes `prompt` for use inside a double-quoted shell argument.
///
/// Backslashes are escaped first so the escapes added for `"`, `$` and
/// `` ` `` are never doubled.
pub fn escape_prompt(prompt: &str) -> String {
    prompt
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
        .replace('`', "\\`")
}

fn preview(prompt: &str) -> String {
    match prompt.char_indices().nth(PROMPT_LOG_LIMIT) {
        Some((cut, _)) => format!("{}...", &prompt[..cut]),
        None => prompt.to_string(),
    }
}

impl<R: ContainerRuntime> SandboxManager<R> {
    /// Runs the agent on `prompt` and reports only liveness.
    ///
    /// A stuck agent triggers [`kill_stuck_processes`](Self::kill_stuck_processes)
    /// and yields exit code 1 with [`STUCK_MESSAGE`]; otherwise the result is
    /// exit code 0 with the full terminal output.
    pub async fn codex_exec(
        &mut self,
        prompt: &str,
        workdir: Option<&str>,
        command_timeout: Option<Duration>,
    ) -> Result<ExecutionResult, SandboxError> {
        if self.instance.is_none() {
            return Err(SandboxError::NotStarted);
        }

        let workdir = workdir.map_or_else(|| self.settings.workspace_dir.clone(), String::from);
        let timeout = command_timeout.unwrap_or(self.settings.command_timeout);
        let command = format!(
            "{} exec \"{}\" --yolo",
            self.settings.agent_path,
            escape_prompt(prompt)
        );

        info!("Executing codex: {}", preview(prompt));

        let outcome = self.run_interactive(&command, &workdir, timeout).await;

        if outcome.verdict.stuck {
            self.kill_stuck_processes().await;
            warn!("{}", STUCK_MESSAGE);
            return Ok(ExecutionResult::new(1, outcome.output, STUCK_MESSAGE));
        }

        Ok(ExecutionResult::success_with(outcome.output))
    }

    /// Streams a tty-backed `command` until it exits, the stream ends, or a
    /// command phase stays open longer than `per_phase_timeout`.
    ///
    /// Never fails: runtime errors end the session early with whatever output
    /// was captured.
    pub async fn run_interactive(
        &mut self,
        command: &str,
        workdir: &str,
        per_phase_timeout: Duration,
    ) -> StreamOutcome {
        let Some(instance) = self.instance.as_ref() else {
            error!("Interactive execution requested without an attached container");
            return StreamOutcome::default();
        };

        let request = ExecRequest {
            argv: vec!["/bin/bash".to_string(), "-c".to_string(), command.to_string()],
            working_dir: Some(workdir.to_string()),
            env: None,
            user: Some("root".to_string()),
        };

        let mut channel = match self.runtime.exec_interactive(&instance.id, &request).await {
            Ok(channel) => channel,
            Err(e) => {
                error!("Failed to attach to {}: {}", instance.name, e);
                return StreamOutcome::default();
            }
        };

        let poll_interval = self.settings.poll_interval;
        let mut monitor = LivenessMonitor::new(per_phase_timeout);
        let mut buffer = Vec::new();
        let mut verdict = StuckVerdict::clear();

        loop {
            match tokio::time::timeout(poll_interval, channel.output.next()).await {
                Ok(Some(Ok(chunk))) => {
                    buffer.extend_from_slice(&chunk);
                    if let Err(e) = self
                        .tail
                        .write_all(&chunk)
                        .and_then(|()| self.tail.flush())
                    {
                        debug!("Failed to mirror output: {}", e);
                    }
                    monitor.observe(&String::from_utf8_lossy(&chunk), Instant::now());
                }
                Ok(Some(Err(e))) => {
                    error!("Error during stuck detection: {}", e);
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    if let Some(elapsed) = monitor.overdue(Instant::now()) {
                        warn!(
                            "Command execution timeout after {:.1}s",
                            elapsed.as_secs_f64()
                        );
                        verdict = StuckVerdict::stuck(elapsed);
                        break;
                    }
                }
            }

            match self.runtime.exec_running(&channel.id).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    error!("Error during stuck detection: {}", e);
                    break;
                }
            }
        }

        channel.close();

        StreamOutcome {
            output: String::from_utf8_lossy(&buffer).into_owned(),
            verdict,
        }
    }
}
