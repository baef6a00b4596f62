//! Scripted container runtime for testing.
//!
//! Keeps containers, images and exec history in memory so lifecycle,
//! provisioning and streaming logic can be exercised without Docker.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::runtime::{
    ContainerRuntime, ContainerStatus, ContainerSummary, CreateSpec, ExecOutput, ExecRequest,
    InteractiveExec,
};
use super::SandboxError;

/// One chunk of scripted terminal output, emitted after `delay`.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedChunk {
    pub delay: Duration,
    pub text: String,
}

/// Scripted behavior for the next interactive exec.
#[derive(Debug, Clone, Default)]
pub(crate) struct InteractiveScript {
    pub chunks: Vec<ScriptedChunk>,
    /// Keep the process alive and silent after the last chunk.
    pub hang: bool,
    /// Fail the stream with this transport error after the last chunk.
    pub error: Option<String>,
}

impl InteractiveScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk(mut self, delay_ms: u64, text: &str) -> Self {
        self.chunks.push(ScriptedChunk {
            delay: Duration::from_millis(delay_ms),
            text: text.to_string(),
        });
        self
    }

    pub fn then_hang(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn then_error(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    /// name -> (id, status)
    containers: HashMap<String, (String, ContainerStatus)>,
    images: Vec<String>,
    pulled: Vec<String>,
    created: Vec<CreateSpec>,
    started: Vec<String>,
    stopped: Vec<String>,
    removed: Vec<String>,
    /// Rendered command line of every one-shot exec, in order.
    execs: Vec<String>,
    /// Exec requests, in order.
    requests: Vec<ExecRequest>,
    /// (substring, exit code, stderr) rules; first match wins.
    failures: Vec<(String, i64, String)>,
    /// (substring, stdout) rules for successful commands.
    outputs: Vec<(String, String)>,
    /// Substrings for which the runtime itself errors.
    transport_failures: Vec<String>,
    interactive: VecDeque<InteractiveScript>,
    interactive_requests: Vec<ExecRequest>,
    running_execs: HashMap<String, Arc<AtomicBool>>,
    /// Makes `exec_running` fail.
    inspect_failure: bool,
    next_id: usize,
}

/// In-memory [`ContainerRuntime`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockRuntime {
    state: Arc<Mutex<MockState>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Registers an existing container.
    pub fn with_container(self, name: &str, status: ContainerStatus) -> Self {
        {
            let mut state = self.state();
            state.next_id += 1;
            let id = format!("existing-{}", state.next_id);
            state.containers.insert(name.to_string(), (id, status));
        }
        self
    }

    pub fn with_image(self, image: &str) -> Self {
        self.state().images.push(image.to_string());
        self
    }

    /// Commands containing `needle` exit with `exit_code`.
    pub fn fail_when(&self, needle: &str, exit_code: i64, stderr: &str) {
        self.state()
            .failures
            .push((needle.to_string(), exit_code, stderr.to_string()));
    }

    /// Commands containing `needle` print `stdout`.
    pub fn output_when(&self, needle: &str, stdout: &str) {
        self.state()
            .outputs
            .push((needle.to_string(), stdout.to_string()));
    }

    /// Commands containing `needle` make the runtime call itself fail.
    pub fn transport_error_when(&self, needle: &str) {
        self.state().transport_failures.push(needle.to_string());
    }

    pub fn push_interactive(&self, script: InteractiveScript) {
        self.state().interactive.push_back(script);
    }

    /// Makes every exec inspection fail with a transport error.
    pub fn fail_exec_inspect(&self) {
        self.state().inspect_failure = true;
    }

    /// Changes a container's status behind the manager's back.
    pub fn set_status(&self, name: &str, status: ContainerStatus) {
        if let Some(entry) = self.state().containers.get_mut(name) {
            entry.1 = status;
        }
    }

    /// Deletes a container behind the manager's back.
    pub fn vanish(&self, name: &str) {
        self.state().containers.remove(name);
    }

    pub fn status_of(&self, name: &str) -> Option<ContainerStatus> {
        self.state().containers.get(name).map(|(_, s)| s.clone())
    }

    pub fn execs(&self) -> Vec<String> {
        self.state().execs.clone()
    }

    pub fn requests(&self) -> Vec<ExecRequest> {
        self.state().requests.clone()
    }

    pub fn interactive_requests(&self) -> Vec<ExecRequest> {
        self.state().interactive_requests.clone()
    }

    pub fn created(&self) -> Vec<CreateSpec> {
        self.state().created.clone()
    }

    pub fn pulled(&self) -> Vec<String> {
        self.state().pulled.clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.state().started.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.state().stopped.clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.state().removed.clone()
    }

    /// Number of recorded one-shot execs containing `needle`.
    pub fn exec_count(&self, needle: &str) -> usize {
        self.state()
            .execs
            .iter()
            .filter(|cmd| cmd.contains(needle))
            .count()
    }

    fn name_for_id(state: &MockState, id: &str) -> Option<String> {
        state
            .containers
            .iter()
            .find(|(_, (cid, _))| cid == id)
            .map(|(name, _)| name.clone())
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn find_container(&self, name: &str) -> Result<Option<ContainerSummary>, SandboxError> {
        Ok(self
            .state()
            .containers
            .get(name)
            .map(|(id, status)| ContainerSummary {
                id: id.clone(),
                status: status.clone(),
                started_at: Some("2026-10-18T09:30:00.000000000Z".to_string()),
            }))
    }

    async fn container_status(&self, id: &str) -> Result<ContainerStatus, SandboxError> {
        let state = self.state();
        state
            .containers
            .values()
            .find(|(cid, _)| cid == id)
            .map(|(_, status)| status.clone())
            .ok_or_else(|| SandboxError::not_found(id))
    }

    async fn image_exists(&self, image: &str) -> Result<bool, SandboxError> {
        Ok(self.state().images.iter().any(|i| i == image))
    }

    async fn pull_image(&self, image: &str) -> Result<(), SandboxError> {
        let mut state = self.state();
        state.pulled.push(image.to_string());
        state.images.push(image.to_string());
        Ok(())
    }

    async fn create_container(&self, spec: &CreateSpec) -> Result<String, SandboxError> {
        let mut state = self.state();
        if state.containers.contains_key(&spec.name) {
            return Err(SandboxError::transport(format!(
                "Conflict. The container name \"/{}\" is already in use",
                spec.name
            )));
        }
        state.next_id += 1;
        let id = format!("container-{}", state.next_id);
        state
            .containers
            .insert(spec.name.clone(), (id.clone(), ContainerStatus::Running));
        state.created.push(spec.clone());
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), SandboxError> {
        let mut state = self.state();
        let name = Self::name_for_id(&state, id).ok_or_else(|| SandboxError::not_found(id))?;
        state.started.push(id.to_string());
        if let Some(entry) = state.containers.get_mut(&name) {
            entry.1 = ContainerStatus::Running;
        }
        Ok(())
    }

    async fn stop_container(&self, id: &str, _grace: Duration) -> Result<(), SandboxError> {
        let mut state = self.state();
        let name = Self::name_for_id(&state, id).ok_or_else(|| SandboxError::not_found(id))?;
        state.stopped.push(id.to_string());
        if let Some(entry) = state.containers.get_mut(&name) {
            entry.1 = ContainerStatus::Exited;
        }
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), SandboxError> {
        let mut state = self.state();
        let name = Self::name_for_id(&state, id).ok_or_else(|| SandboxError::not_found(id))?;
        state.containers.remove(&name);
        state.removed.push(id.to_string());
        Ok(())
    }

    async fn exec(&self, id: &str, request: &ExecRequest) -> Result<ExecOutput, SandboxError> {
        let mut state = self.state();
        if Self::name_for_id(&state, id).is_none() {
            return Err(SandboxError::not_found(id));
        }

        let rendered = request.argv.join(" ");
        state.execs.push(rendered.clone());
        state.requests.push(request.clone());

        if state
            .transport_failures
            .iter()
            .any(|needle| rendered.contains(needle.as_str()))
        {
            return Err(SandboxError::transport("exec create failed: connection reset"));
        }

        if let Some((_, exit_code, stderr)) = state
            .failures
            .iter()
            .find(|(needle, _, _)| rendered.contains(needle.as_str()))
        {
            return Ok(ExecOutput {
                exit_code: *exit_code,
                stdout: Vec::new(),
                stderr: stderr.clone().into_bytes(),
            });
        }

        let stdout = state
            .outputs
            .iter()
            .find(|(needle, _)| rendered.contains(needle.as_str()))
            .map(|(_, out)| out.clone().into_bytes())
            .unwrap_or_default();

        Ok(ExecOutput {
            exit_code: 0,
            stdout,
            stderr: Vec::new(),
        })
    }

    async fn exec_interactive(
        &self,
        id: &str,
        request: &ExecRequest,
    ) -> Result<InteractiveExec, SandboxError> {
        let mut state = self.state();
        if Self::name_for_id(&state, id).is_none() {
            return Err(SandboxError::not_found(id));
        }

        state.interactive_requests.push(request.clone());
        let script = state.interactive.pop_front().unwrap_or_default();
        state.next_id += 1;
        let exec_id = format!("exec-{}", state.next_id);
        let running = Arc::new(AtomicBool::new(true));
        state.running_execs.insert(exec_id.clone(), running.clone());

        let queue: VecDeque<ScriptedChunk> = script.chunks.into();
        let hang = script.hang;
        let output = stream::unfold((queue, script.error), move |(mut queue, mut error)| {
            let running = running.clone();
            async move {
                if let Some(chunk) = queue.pop_front() {
                    tokio::time::sleep(chunk.delay).await;
                    return Some((Ok(Bytes::from(chunk.text)), (queue, error)));
                }
                if let Some(message) = error.take() {
                    return Some((Err(SandboxError::transport(message)), (queue, error)));
                }
                if hang {
                    futures_util::future::pending::<()>().await;
                }
                running.store(false, Ordering::SeqCst);
                None
            }
        })
        .boxed();

        Ok(InteractiveExec {
            id: exec_id,
            output,
            stdin: None,
        })
    }

    async fn exec_running(&self, exec_id: &str) -> Result<bool, SandboxError> {
        let state = self.state();
        if state.inspect_failure {
            return Err(SandboxError::transport("exec inspect failed: connection reset"));
        }
        state
            .running_execs
            .get(exec_id)
            .map(|flag| flag.load(Ordering::SeqCst))
            .ok_or_else(|| SandboxError::not_found(exec_id))
    }
}
