use async_trait::async_trait;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, InspectContainerOptions, LogOutput,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, RestartPolicy, RestartPolicyNameEnum};
use bollard::Docker;
use futures_util::StreamExt;
use std::time::Duration;
use tracing::{debug, info};

use super::runtime::{
    ContainerRuntime, ContainerStatus, ContainerSummary, CreateSpec, ExecOutput, ExecRequest,
    InteractiveExec,
};
use super::SandboxError;

/// [`ContainerRuntime`] backed by the local Docker daemon.
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects to the local Docker daemon and checks it answers.
    pub async fn connect() -> Result<Self, SandboxError> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| {
            SandboxError::transport(format!("Failed to connect to Docker. Is Docker running? {e}"))
        })?;

        docker.ping().await.map_err(|e| {
            SandboxError::transport(format!("Cannot ping Docker daemon. Is Docker running? {e}"))
        })?;

        Ok(Self { docker })
    }

    fn exec_options(request: &ExecRequest, tty: bool) -> CreateExecOptions<String> {
        let env = request.env.as_ref().map(|vars| {
            vars.iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
        });

        CreateExecOptions {
            cmd: Some(request.argv.clone()),
            working_dir: request.working_dir.clone(),
            env,
            user: request.user.clone(),
            tty: Some(tty),
            attach_stdin: Some(tty),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        }
    }
}

fn restart_policy(name: &str) -> RestartPolicyNameEnum {
    match name {
        "always" => RestartPolicyNameEnum::ALWAYS,
        "on-failure" => RestartPolicyNameEnum::ON_FAILURE,
        "no" => RestartPolicyNameEnum::NO,
        _ => RestartPolicyNameEnum::UNLESS_STOPPED,
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn find_container(&self, name: &str) -> Result<Option<ContainerSummary>, SandboxError> {
        let inspect = match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(inspect) => inspect,
            Err(e) => {
                let err = SandboxError::from(e);
                if err.is_not_found() {
                    return Ok(None);
                }
                return Err(err);
            }
        };

        let state = inspect.state.as_ref();
        let status = ContainerStatus::from_docker_state(
            state
                .and_then(|s| s.status.as_ref())
                .map(|s| s.as_ref())
                .unwrap_or("unknown"),
        );

        Ok(Some(ContainerSummary {
            id: inspect.id.clone().unwrap_or_else(|| name.to_string()),
            status,
            started_at: state.and_then(|s| s.started_at.clone()),
        }))
    }

    async fn container_status(&self, id: &str) -> Result<ContainerStatus, SandboxError> {
        let inspect = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;

        Ok(ContainerStatus::from_docker_state(
            inspect
                .state
                .as_ref()
                .and_then(|s| s.status.as_ref())
                .map(|s| s.as_ref())
                .unwrap_or("unknown"),
        ))
    }

    async fn image_exists(&self, image: &str) -> Result<bool, SandboxError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = SandboxError::from(e);
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn pull_image(&self, image: &str) -> Result<(), SandboxError> {
        let pull_options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(pull_options), None, None);

        while let Some(chunk) = stream.next().await {
            let output = chunk?;
            if let Some(error) = output.error {
                return Err(SandboxError::transport(format!("Docker pull error: {error}")));
            }
            if let Some(status) = output.status {
                debug!("pull {}: {}", image, status.trim());
            }
        }

        Ok(())
    }

    async fn create_container(&self, spec: &CreateSpec) -> Result<String, SandboxError> {
        let config = ContainerConfig {
            image: Some(spec.image.clone()),
            tty: Some(true),
            open_stdin: Some(true),
            working_dir: Some(spec.working_dir.clone()),
            cmd: Some(spec.command.clone()),
            user: Some(spec.user.clone()),
            host_config: Some(HostConfig {
                binds: Some(vec![format!(
                    "{}:{}:rw",
                    spec.volume_name, spec.volume_target
                )]),
                restart_policy: Some(RestartPolicy {
                    name: Some(restart_policy(&spec.restart_policy)),
                    maximum_retry_count: None,
                }),
                network_mode: Some(spec.network_mode.clone()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: spec.name.clone(),
                    platform: None,
                }),
                config,
            )
            .await?;

        self.start_container(&response.id).await?;
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), SandboxError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), SandboxError> {
        let options = StopContainerOptions {
            t: i64::try_from(grace.as_secs()).unwrap_or(i64::MAX),
        };
        self.docker.stop_container(id, Some(options)).await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), SandboxError> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    async fn exec(&self, id: &str, request: &ExecRequest) -> Result<ExecOutput, SandboxError> {
        let exec = self
            .docker
            .create_exec(id, Self::exec_options(request, false))
            .await?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        match self.docker.start_exec(&exec.id, None).await? {
            StartExecResults::Attached { mut output, .. } => {
                while let Some(chunk) = output.next().await {
                    match chunk? {
                        LogOutput::StdErr { message } => stderr.extend_from_slice(&message),
                        LogOutput::StdOut { message } | LogOutput::Console { message } => {
                            stdout.extend_from_slice(&message);
                        }
                        LogOutput::StdIn { .. } => {}
                    }
                }
            }
            StartExecResults::Detached => {
                return Err(SandboxError::transport("Exec was detached unexpectedly"));
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;

        Ok(ExecOutput {
            exit_code: inspect.exit_code.unwrap_or(-1),
            stdout,
            stderr,
        })
    }

    async fn exec_interactive(
        &self,
        id: &str,
        request: &ExecRequest,
    ) -> Result<InteractiveExec, SandboxError> {
        let exec = self
            .docker
            .create_exec(id, Self::exec_options(request, true))
            .await?;

        let options = StartExecOptions {
            tty: true,
            ..Default::default()
        };

        match self.docker.start_exec(&exec.id, Some(options)).await? {
            StartExecResults::Attached { output, input } => {
                info!("Attached to interactive exec {}", exec.id);
                let output = output
                    .map(|chunk| chunk.map(LogOutput::into_bytes).map_err(SandboxError::from))
                    .boxed();
                Ok(InteractiveExec {
                    id: exec.id,
                    output,
                    stdin: Some(input),
                })
            }
            StartExecResults::Detached => {
                Err(SandboxError::transport("Exec was detached unexpectedly"))
            }
        }
    }

    async fn exec_running(&self, exec_id: &str) -> Result<bool, SandboxError> {
        let inspect = self.docker.inspect_exec(exec_id).await?;
        Ok(inspect.running.unwrap_or(false))
    }
}
