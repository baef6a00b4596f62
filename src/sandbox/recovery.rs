//! Recovery after a stuck agent.

use tracing::{debug, info, warn};

use super::lifecycle::SandboxManager;
use super::runtime::ContainerRuntime;

/// Dev servers an agent typically leaves running in the foreground, by name
/// and by well-known port. Every command tolerates finding nothing.
pub const KILL_COMMANDS: &[&str] = &[
    "pkill -f 'bun dev' || true",
    "pkill -f 'npm run' || true",
    "pkill -f 'node.*server' || true",
    "pkill -f 'python.*-m.*http' || true",
    "pkill -f 'flask run' || true",
    "pkill -f 'uvicorn' || true",
    "pkill -f 'gunicorn' || true",
    "fuser -k 3000/tcp 2>/dev/null || true",
    "fuser -k 5000/tcp 2>/dev/null || true",
    "fuser -k 8000/tcp 2>/dev/null || true",
    "fuser -k 8080/tcp 2>/dev/null || true",
];

impl<R: ContainerRuntime> SandboxManager<R> {
    /// Best-effort kill of runaway dev-server processes. Never fails.
    pub async fn kill_stuck_processes(&self) {
        info!("Killing stuck processes in {}", self.settings.name);
        for command in KILL_COMMANDS {
            match self.execute(*command).await {
                Ok(result) if result.success() => debug!("{}: ok", command),
                Ok(result) => debug!("{}: exit {}", command, result.exit_code()),
                Err(e) => warn!("{}: {}", command, e),
            }
        }
    }
}
