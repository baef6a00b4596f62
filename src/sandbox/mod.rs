//! Docker sandbox for running a coding agent.
//!
//! A single named container is created once, provisioned with the agent
//! toolchain and then reused across runs. Agent sessions stream through a
//! pseudo-terminal and are abandoned when a tool invocation hangs.

mod docker;
mod error;
mod exec;
mod interactive;
mod lifecycle;
mod liveness;
#[cfg(test)]
pub(crate) mod mock;
mod provision;
mod recovery;
mod result;
mod runtime;

pub(crate) use docker::DockerRuntime;
pub(crate) use error::SandboxError;
pub(crate) use exec::{Command, ExecOptions};
pub(crate) use lifecycle::{
    Instance, SandboxManager, SandboxSettings, DEFAULT_IMAGE, DEFAULT_NAME, DEFAULT_WORKING_DIR,
    DEFAULT_WORKSPACE_DIR,
};
pub(crate) use result::ExecutionResult;
#[cfg(test)]
pub(crate) use runtime::ContainerStatus;
pub(crate) use runtime::ContainerSummary;
