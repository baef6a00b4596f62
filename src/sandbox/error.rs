//! Domain-specific error types for sandbox operations.
//!
//! Typed errors enable callers to match on specific failure modes
//! rather than parsing error message strings.

use std::time::Duration;

/// Errors that can occur during sandbox operations.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// An operation needing the container was called before `acquire()`.
    #[error("Container not started. Call acquire() first.")]
    NotStarted,

    /// The container exists but is not in the running state.
    #[error("Container is not running (status: {status})")]
    NotRunning { status: String },

    /// A step of the fresh-container provisioning sequence failed.
    #[error("Provisioning failed at '{step}' (exit code {exit_code}): {stderr}")]
    ProvisioningFailure {
        step: String,
        exit_code: i64,
        stderr: String,
    },

    /// A container runtime call failed unexpectedly.
    #[error("Container runtime error: {message}")]
    Transport { message: String },

    /// The named container (or exec) no longer exists.
    #[error("Container not found: {name}")]
    NotFound { name: String },

    /// The agent stopped making progress inside a tool invocation.
    #[error("Agent stuck for {elapsed_secs} seconds")]
    Stuck { elapsed_secs: u64 },
}

impl SandboxError {
    /// Creates a `NotRunning` error.
    pub fn not_running(status: impl Into<String>) -> Self {
        Self::NotRunning {
            status: status.into(),
        }
    }

    /// Creates a `ProvisioningFailure` error.
    pub fn provisioning_failure(
        step: impl Into<String>,
        exit_code: i64,
        stderr: impl Into<String>,
    ) -> Self {
        Self::ProvisioningFailure {
            step: step.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Creates a `Transport` error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a `NotFound` error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates a `Stuck` error from a `Duration`.
    pub fn stuck(elapsed: Duration) -> Self {
        Self::Stuck {
            elapsed_secs: elapsed.as_secs(),
        }
    }

    /// Returns true if the container is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a precondition violation (`NotStarted` / `NotRunning`).
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NotStarted | Self::NotRunning { .. })
    }

    /// Returns true if this is a provisioning failure.
    pub fn is_provisioning_failure(&self) -> bool {
        matches!(self, Self::ProvisioningFailure { .. })
    }

    /// Returns true if this is a stuck verdict.
    #[allow(dead_code)] // Public API for callers
    pub fn is_stuck(&self) -> bool {
        matches!(self, Self::Stuck { .. })
    }
}

impl From<bollard::errors::Error> for SandboxError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => Self::NotFound { name: message },
            other => Self::Transport {
                message: other.to_string(),
            },
        }
    }
}
