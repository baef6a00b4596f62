//! Lifecycle of the single named sandbox container.
//!
//! `acquire()` reuses a running or stopped container when one exists and only
//! provisions a freshly created one. The container outlives the process; only
//! `destroy()` removes it.

use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::runtime::{ContainerRuntime, ContainerStatus, ContainerSummary, CreateSpec};
use super::SandboxError;
use crate::templates::Templates;

/// Default container name.
pub const DEFAULT_NAME: &str = "swea";
/// Default base image.
pub const DEFAULT_IMAGE: &str = "ubuntu:24.04";
/// Working directory of the container and of commands run in it.
pub const DEFAULT_WORKING_DIR: &str = "/root";
/// Where the persistent volume is mounted.
pub const DEFAULT_WORKSPACE_DIR: &str = "/root/workspace";

/// Static parameters of a sandbox.
#[derive(Debug, Clone)]
pub struct SandboxSettings {
    pub name: String,
    pub image: String,
    pub working_dir: String,
    pub workspace_dir: String,
    /// Grace period given to the container on stop.
    pub stop_grace: Duration,
    /// Agent CLI executable inside the container.
    pub agent_path: String,
    /// Default per-phase liveness timeout for `codex_exec`.
    pub command_timeout: Duration,
    /// How long one iteration of the streaming loop waits for output.
    pub poll_interval: Duration,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            working_dir: DEFAULT_WORKING_DIR.to_string(),
            workspace_dir: DEFAULT_WORKSPACE_DIR.to_string(),
            stop_grace: Duration::from_secs(10),
            agent_path: "codex".to_string(),
            command_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl SandboxSettings {
    /// Name of the named volume holding the workspace.
    pub fn volume_name(&self) -> String {
        format!("{}-data", self.name)
    }

    fn create_spec(&self) -> CreateSpec {
        CreateSpec {
            name: self.name.clone(),
            image: self.image.clone(),
            working_dir: self.working_dir.clone(),
            command: vec!["/bin/bash".to_string()],
            user: "root".to_string(),
            volume_name: self.volume_name(),
            volume_target: self.workspace_dir.clone(),
            restart_policy: "unless-stopped".to_string(),
            network_mode: "host".to_string(),
        }
    }
}

/// The live container this manager is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub image: String,
    pub working_dir: String,
    /// True when this session attached to a pre-existing container.
    pub reused: bool,
}

impl Instance {
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(12)]
    }
}

/// Owns the handle to the sandbox container.
///
/// Only the manager's own lifecycle methods set or clear the handle; every
/// other operation borrows it.
pub struct SandboxManager<R: ContainerRuntime> {
    pub(crate) runtime: R,
    pub(crate) settings: SandboxSettings,
    pub(crate) templates: Templates,
    pub(crate) instance: Option<Instance>,
    /// Receives interactive output as it arrives.
    pub(crate) tail: Box<dyn Write + Send>,
}

impl<R: ContainerRuntime> SandboxManager<R> {
    pub fn new(runtime: R, settings: SandboxSettings, templates: Templates) -> Self {
        Self {
            runtime,
            settings,
            templates,
            instance: None,
            tail: Box::new(std::io::stdout()),
        }
    }

    /// Sends the live tail of interactive sessions somewhere other than stdout.
    pub fn with_tail(mut self, tail: Box<dyn Write + Send>) -> Self {
        self.tail = tail;
        self
    }

    pub fn settings(&self) -> &SandboxSettings {
        &self.settings
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    pub fn container_id(&self) -> Option<&str> {
        self.instance.as_ref().map(|i| i.id.as_str())
    }

    pub fn was_reused(&self) -> bool {
        self.instance.as_ref().is_some_and(|i| i.reused)
    }

    /// Acquires the sandbox for a scope. The container is left running when
    /// the session ends.
    pub async fn session(&mut self) -> Result<SandboxSession<'_, R>, SandboxError> {
        self.acquire().await?;
        Ok(SandboxSession { manager: self })
    }

    /// Ensures the named container exists and is running, creating and
    /// provisioning it if needed.
    pub async fn acquire(&mut self) -> Result<Instance, SandboxError> {
        if self.instance.take().is_some() {
            debug!("Re-checking container {}", self.settings.name);
        }

        if let Some(existing) = self.runtime.find_container(&self.settings.name).await? {
            match existing.status {
                ContainerStatus::Running => {
                    info!("Reusing existing running container {}", self.settings.name);
                    return Ok(self.attach_to(existing.id, true));
                }
                ContainerStatus::Exited => {
                    info!("Starting existing stopped container {}", self.settings.name);
                    self.runtime.start_container(&existing.id).await?;
                    return Ok(self.attach_to(existing.id, true));
                }
                status => {
                    info!(
                        "Removing container {} in state {}",
                        self.settings.name, status
                    );
                    self.runtime.remove_container(&existing.id).await?;
                }
            }
        }

        self.ensure_image().await?;

        info!(
            "Creating container {} from {}...",
            self.settings.name, self.settings.image
        );
        let id = self
            .runtime
            .create_container(&self.settings.create_spec())
            .await?;
        let instance = self.attach_to(id, false);
        info!(
            "Container {} started with ID {}",
            instance.name,
            instance.short_id()
        );

        self.provision().await?;
        Ok(instance)
    }

    /// Attaches to an existing container by name without creating or
    /// starting anything.
    pub async fn attach(&mut self) -> Result<Option<Instance>, SandboxError> {
        self.instance = None;
        match self.runtime.find_container(&self.settings.name).await? {
            Some(existing) => Ok(Some(self.attach_to(existing.id, true))),
            None => Ok(None),
        }
    }

    /// Drops the in-memory handle, leaving the container as it is.
    pub fn detach(&mut self) {
        if let Some(instance) = self.instance.take() {
            debug!("Leaving container {} running for reuse", instance.name);
        }
    }

    /// Stops the container but keeps it for later reuse.
    pub async fn release(&mut self) -> Result<(), SandboxError> {
        let Some(instance) = self.instance.take() else {
            warn!("No container to stop");
            return Ok(());
        };

        let outcome = async {
            if self.runtime.container_status(&instance.id).await?.is_running() {
                info!("Stopping container {}...", instance.name);
                self.runtime
                    .stop_container(&instance.id, self.settings.stop_grace)
                    .await?;
                info!("Container {} stopped", instance.name);
            }
            Ok::<(), SandboxError>(())
        }
        .await;

        tolerate_missing(&instance, outcome)
    }

    /// Permanently removes the container. The named volume is kept.
    pub async fn destroy(&mut self) -> Result<(), SandboxError> {
        let Some(instance) = self.instance.take() else {
            warn!("No container to remove");
            return Ok(());
        };

        let outcome = async {
            if self.runtime.container_status(&instance.id).await?.is_running() {
                self.runtime
                    .stop_container(&instance.id, self.settings.stop_grace)
                    .await?;
            }
            info!("Removing container {}...", instance.name);
            self.runtime.remove_container(&instance.id).await?;
            info!("Container {} removed", instance.name);
            Ok::<(), SandboxError>(())
        }
        .await;

        tolerate_missing(&instance, outcome)
    }

    /// Re-syncs workspace, agent config and AGENTS.md into a running container.
    pub async fn reinitialize(&mut self) -> Result<(), SandboxError> {
        self.ensure_running().await?;

        info!("Re-initializing container configuration...");
        self.setup_workspace().await?;
        self.sync_config().await?;
        self.sync_agents().await?;
        info!("Container re-initialized successfully");
        Ok(())
    }

    /// Live status of the named container, attached or not.
    pub async fn status(&self) -> Result<Option<ContainerSummary>, SandboxError> {
        self.runtime.find_container(&self.settings.name).await
    }

    pub async fn is_running(&self) -> bool {
        let Some(instance) = &self.instance else {
            return false;
        };
        match self.runtime.container_status(&instance.id).await {
            Ok(status) => status.is_running(),
            Err(e) => {
                debug!("Status check for {} failed: {}", instance.name, e);
                false
            }
        }
    }

    /// The attached instance, provided its container is running.
    pub(crate) async fn ensure_running(&self) -> Result<&Instance, SandboxError> {
        let instance = self.instance.as_ref().ok_or(SandboxError::NotStarted)?;
        match self.runtime.container_status(&instance.id).await {
            Ok(status) if status.is_running() => Ok(instance),
            Ok(status) => Err(SandboxError::not_running(status.to_string())),
            Err(e) if e.is_not_found() => Err(SandboxError::not_running("absent")),
            Err(e) => Err(e),
        }
    }

    async fn ensure_image(&self) -> Result<(), SandboxError> {
        let image = &self.settings.image;
        if self.runtime.image_exists(image).await? {
            info!("Image {} already exists locally", image);
        } else {
            info!("Pulling image {}...", image);
            self.runtime.pull_image(image).await?;
            info!("Successfully pulled {}", image);
        }
        Ok(())
    }

    fn attach_to(&mut self, id: String, reused: bool) -> Instance {
        let instance = Instance {
            id,
            name: self.settings.name.clone(),
            image: self.settings.image.clone(),
            working_dir: self.settings.working_dir.clone(),
            reused,
        };
        self.instance = Some(instance.clone());
        instance
    }
}

fn tolerate_missing(
    instance: &Instance,
    outcome: Result<(), SandboxError>,
) -> Result<(), SandboxError> {
    match outcome {
        Err(e) if e.is_not_found() => {
            warn!("Container {} not found", instance.name);
            Ok(())
        }
        other => other,
    }
}

/// Scoped use of an acquired sandbox.
///
/// Dropping the session detaches from the container without stopping it, so
/// the next session can reuse it.
pub struct SandboxSession<'a, R: ContainerRuntime> {
    manager: &'a mut SandboxManager<R>,
}

impl<R: ContainerRuntime> Deref for SandboxSession<'_, R> {
    type Target = SandboxManager<R>;

    fn deref(&self) -> &Self::Target {
        self.manager
    }
}

impl<R: ContainerRuntime> DerefMut for SandboxSession<'_, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.manager
    }
}

impl<R: ContainerRuntime> Drop for SandboxSession<'_, R> {
    fn drop(&mut self) {
        self.manager.detach();
    }
}
