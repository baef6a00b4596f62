//! The container runtime boundary.
//!
//! Everything the sandbox needs from Docker goes through [`ContainerRuntime`],
//! so lifecycle and streaming logic can run against a scripted runtime in tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tracing::debug;

use super::SandboxError;

/// Observed state of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown(String),
}

impl ContainerStatus {
    /// Maps a Docker state string onto a status.
    pub fn from_docker_state(state: &str) -> Self {
        match state.to_lowercase().as_str() {
            "created" => Self::Created,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "removing" => Self::Removing,
            "exited" => Self::Exited,
            "dead" => Self::Dead,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Restarting => write!(f, "restarting"),
            Self::Removing => write!(f, "removing"),
            Self::Exited => write!(f, "exited"),
            Self::Dead => write!(f, "dead"),
            Self::Unknown(state) => write!(f, "{state}"),
        }
    }
}

/// A container found by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub status: ContainerStatus,
    /// RFC 3339 start time, when the runtime reports one.
    pub started_at: Option<String>,
}

/// Everything needed to create the sandbox container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSpec {
    pub name: String,
    pub image: String,
    pub working_dir: String,
    pub command: Vec<String>,
    pub user: String,
    /// Named volume mounted read-write at `volume_target`.
    pub volume_name: String,
    pub volume_target: String,
    pub restart_policy: String,
    pub network_mode: String,
}

/// A process to spawn inside the container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecRequest {
    pub argv: Vec<String>,
    pub working_dir: Option<String>,
    pub env: Option<HashMap<String, String>>,
    pub user: Option<String>,
}

/// Collected output of a finished exec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// A live pseudo-terminal exec.
///
/// Dropping it closes the attached channel.
pub struct InteractiveExec {
    pub id: String,
    pub output: BoxStream<'static, Result<Bytes, SandboxError>>,
    /// Write side of the terminal. Held open so the process never sees EOF on stdin.
    pub stdin: Option<Pin<Box<dyn AsyncWrite + Send>>>,
}

impl InteractiveExec {
    /// Closes the attached channel.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for InteractiveExec {
    fn drop(&mut self) {
        debug!("Closing interactive exec {}", self.id);
    }
}

/// Operations the sandbox consumes from a container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Looks up a container by name. `Ok(None)` when absent.
    async fn find_container(&self, name: &str) -> Result<Option<ContainerSummary>, SandboxError>;

    /// Returns the live status of a container. Absent containers yield `NotFound`.
    async fn container_status(&self, id: &str) -> Result<ContainerStatus, SandboxError>;

    async fn image_exists(&self, image: &str) -> Result<bool, SandboxError>;

    async fn pull_image(&self, image: &str) -> Result<(), SandboxError>;

    /// Creates the container and starts it, returning its id.
    async fn create_container(&self, spec: &CreateSpec) -> Result<String, SandboxError>;

    async fn start_container(&self, id: &str) -> Result<(), SandboxError>;

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), SandboxError>;

    async fn remove_container(&self, id: &str) -> Result<(), SandboxError>;

    /// Runs a process to completion and returns its demultiplexed output.
    async fn exec(&self, id: &str, request: &ExecRequest) -> Result<ExecOutput, SandboxError>;

    /// Spawns a tty-backed process and attaches to its combined output.
    async fn exec_interactive(
        &self,
        id: &str,
        request: &ExecRequest,
    ) -> Result<InteractiveExec, SandboxError>;

    /// Whether an exec started by `exec_interactive` is still running.
    async fn exec_running(&self, exec_id: &str) -> Result<bool, SandboxError>;
}
