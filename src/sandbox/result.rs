//! Outcome of a command run inside the sandbox.

use super::SandboxError;

/// Exit code reported when the runtime could not launch or collect a command.
pub const LAUNCH_FAILURE_EXIT_CODE: i64 = -1;

/// Exit code, captured stdout and captured stderr of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    exit_code: i64,
    stdout: String,
    stderr: String,
}

impl ExecutionResult {
    pub fn new(exit_code: i64, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// A zero-exit result carrying only stdout.
    pub fn success_with(stdout: impl Into<String>) -> Self {
        Self::new(0, stdout, String::new())
    }

    /// A result for a command the runtime never managed to run.
    pub fn launch_failure(message: impl Into<String>) -> Self {
        Self::new(LAUNCH_FAILURE_EXIT_CODE, String::new(), message)
    }

    pub fn exit_code(&self) -> i64 {
        self.exit_code
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// True if and only if the exit code is zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turns a failed result into a provisioning error labelled with `step`.
    pub fn ensure_success(self, step: &str) -> Result<Self, SandboxError> {
        if self.success() {
            Ok(self)
        } else {
            Err(SandboxError::provisioning_failure(
                step,
                self.exit_code,
                self.stderr,
            ))
        }
    }
}
