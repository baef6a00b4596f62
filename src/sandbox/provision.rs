//! Provisioning of a freshly created sandbox.

use tracing::info;

use super::lifecycle::SandboxManager;
use super::runtime::ContainerRuntime;
use super::SandboxError;

/// One fatal provisioning step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProvisionStep {
    pub label: &'static str,
    pub command: &'static str,
}

/// Toolchain installation run once, on fresh containers only.
pub(crate) const PROVISION_STEPS: &[ProvisionStep] = &[
    ProvisionStep {
        label: "Installing system dependencies",
        command: "apt-get update && apt-get install -y curl ca-certificates gnupg git python3 python3-pip python3-venv",
    },
    ProvisionStep {
        label: "Installing Node.js",
        command: "curl -fsSL https://deb.nodesource.com/setup_22.x | bash - && apt-get install -y nodejs",
    },
    ProvisionStep {
        label: "Installing @openai/codex",
        command: "npm install -g @openai/codex",
    },
    ProvisionStep {
        label: "Checking codex version",
        command: "codex --version",
    },
    ProvisionStep {
        label: "Installing uv",
        command: "curl -LsSf https://astral.sh/uv/install.sh | sh",
    },
    ProvisionStep {
        label: "Adding uv to PATH",
        command: "echo 'export PATH=\"/root/.local/bin:$PATH\"' >> /root/.bashrc",
    },
    ProvisionStep {
        label: "Cloning vibetest-use",
        command: "cd /root && git clone https://github.com/browser-use/vibetest-use.git",
    },
    ProvisionStep {
        label: "Setting up vibetest-use virtual environment",
        command: "cd /root/vibetest-use && /root/.local/bin/uv venv && . .venv/bin/activate && /root/.local/bin/uv pip install -e .",
    },
    ProvisionStep {
        label: "Installing Playwright Chromium",
        command: "cd /root/vibetest-use && . .venv/bin/activate && playwright install chromium --with-deps",
    },
];

const GIT_USER_EMAIL: &str = "swea@local";
const GIT_USER_NAME: &str = "SWEA";
const CODEX_CONFIG_DIR: &str = "/root/.codex";

impl<R: ContainerRuntime> SandboxManager<R> {
    /// Runs the full provisioning sequence, stopping at the first failure.
    pub(crate) async fn provision(&self) -> Result<(), SandboxError> {
        for step in PROVISION_STEPS {
            info!("{}...", step.label);
            let result = self.execute(step.command).await?.ensure_success(step.label)?;
            if step.command.ends_with("--version") {
                info!("Agent CLI installed: {}", result.stdout().trim());
            }
        }

        self.setup_workspace().await?;
        self.sync_config().await?;
        self.sync_agents().await?;
        Ok(())
    }

    /// Creates the workspace git repository. Safe to re-run.
    pub(crate) async fn setup_workspace(&self) -> Result<(), SandboxError> {
        let workspace = shell_words::quote(&self.settings.workspace_dir).into_owned();
        info!("Setting up workspace with git repo...");

        self.execute(format!(
            "mkdir -p {workspace} && cd {workspace} && git init 2>/dev/null || true"
        ))
        .await?
        .ensure_success("Creating workspace directory")?;

        self.execute(format!(
            "cd {workspace} && git config user.email '{GIT_USER_EMAIL}' && git config user.name '{GIT_USER_NAME}'"
        ))
        .await?
        .ensure_success("Configuring git")?;

        Ok(())
    }

    /// Writes the rendered agent CLI config.
    pub(crate) async fn sync_config(&self) -> Result<(), SandboxError> {
        info!("Syncing Codex CLI config...");
        self.execute(format!("mkdir -p {CODEX_CONFIG_DIR}"))
            .await?
            .ensure_success("Creating codex config directory")?;

        let config = self.templates.render_codex_config();
        self.write_file(&format!("{CODEX_CONFIG_DIR}/config.toml"), &config)
            .await?
            .ensure_success("Writing codex config")?;

        info!("Codex CLI config synced");
        Ok(())
    }

    /// Writes AGENTS.md into the workspace.
    pub(crate) async fn sync_agents(&self) -> Result<(), SandboxError> {
        info!("Syncing AGENTS.md...");
        let path = format!("{}/AGENTS.md", self.settings.workspace_dir);
        self.write_file(&path, &self.templates.agents_md)
            .await?
            .ensure_success("Writing AGENTS.md")?;

        info!("AGENTS.md synced to {}", self.settings.workspace_dir);
        Ok(())
    }
}
