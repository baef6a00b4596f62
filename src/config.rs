use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::sandbox::{
    SandboxSettings, DEFAULT_IMAGE, DEFAULT_NAME, DEFAULT_WORKING_DIR, DEFAULT_WORKSPACE_DIR,
};
use crate::templates::DEFAULT_API_KEY_VAR;

const CONFIG_FILE: &str = "swea.toml";

/// Overrides the sandbox name from the environment.
pub const NAME_ENV: &str = "SWEA_SANDBOX_NAME";
/// Overrides the base image from the environment.
pub const IMAGE_ENV: &str = "SWEA_IMAGE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
}

/// Container configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Container name; also prefixes the workspace volume
    #[serde(default = "default_name")]
    pub name: String,

    /// Base image
    #[serde(default = "default_image")]
    pub image: String,

    /// Container working directory
    #[serde(default = "default_working_dir")]
    pub working_dir: String,

    /// Mount point of the persistent workspace volume
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: String,

    /// Grace period before a stopping container is killed
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            image: default_image(),
            working_dir: default_working_dir(),
            workspace_dir: default_workspace_dir(),
            stop_timeout_secs: default_stop_timeout(),
        }
    }
}

/// Agent CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Path to the codex CLI inside the container
    #[serde(default = "default_agent_path")]
    pub path: String,

    /// Seconds a tool invocation may stay silent before the agent counts as stuck
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Output polling interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            path: default_agent_path(),
            command_timeout_secs: default_command_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Template locations on the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Codex `config.toml` template (built-in default when unset)
    #[serde(default)]
    pub codex_config: Option<String>,

    /// `AGENTS.md` template (built-in default when unset)
    #[serde(default)]
    pub agents_md: Option<String>,

    /// Environment variable substituted into the codex config
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            codex_config: None,
            agents_md: None,
            api_key_env: default_api_key_env(),
        }
    }
}

// Default value functions
fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn default_working_dir() -> String {
    DEFAULT_WORKING_DIR.to_string()
}

fn default_workspace_dir() -> String {
    DEFAULT_WORKSPACE_DIR.to_string()
}

fn default_stop_timeout() -> u64 {
    10
}

fn default_agent_path() -> String {
    "codex".to_string()
}

fn default_command_timeout() -> u64 {
    20
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_VAR.to_string()
}

impl Config {
    /// Load configuration from file, using defaults if not found
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    /// Apply overrides: CLI flags beat environment variables beat the file.
    pub fn with_overrides(mut self, name: Option<String>, image: Option<String>) -> Self {
        if let Some(name) = name.or_else(|| non_empty_env(NAME_ENV)) {
            self.sandbox.name = name;
        }
        if let Some(image) = image.or_else(|| non_empty_env(IMAGE_ENV)) {
            self.sandbox.image = image;
        }
        self
    }

    pub fn sandbox_settings(&self) -> SandboxSettings {
        SandboxSettings {
            name: self.sandbox.name.clone(),
            image: self.sandbox.image.clone(),
            working_dir: self.sandbox.working_dir.clone(),
            workspace_dir: self.sandbox.workspace_dir.clone(),
            stop_grace: Duration::from_secs(self.sandbox.stop_timeout_secs),
            agent_path: self.agent.path.clone(),
            command_timeout: Duration::from_secs(self.agent.command_timeout_secs),
            poll_interval: Duration::from_millis(self.agent.poll_interval_ms.max(1)),
        }
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

/// Expand ~ to home directory
pub fn expand_path(path: &str) -> Result<String> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(rest).display().to_string())
    } else {
        Ok(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sandbox.name, "swea");
        assert_eq!(config.sandbox.image, "ubuntu:24.04");
        assert_eq!(config.agent.command_timeout_secs, 20);
        assert_eq!(config.templates.api_key_env, "GOOGLE_API_KEY");
        assert!(config.templates.codex_config.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[sandbox]
name = "swea-dev"
image = "ubuntu:22.04"

[agent]
command_timeout_secs = 45

[templates]
codex_config = "SAMPLE_config.toml"
agents_md = "~/swea/AGENTS.md"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.sandbox.name, "swea-dev");
        assert_eq!(config.sandbox.image, "ubuntu:22.04");
        assert_eq!(config.sandbox.workspace_dir, "/root/workspace");
        assert_eq!(config.agent.command_timeout_secs, 45);
        assert_eq!(config.agent.path, "codex");
        assert_eq!(
            config.templates.codex_config.as_deref(),
            Some("SAMPLE_config.toml")
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.sandbox.name, "swea");
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[sandbox\nname = ").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_cli_overrides_win() {
        let config = Config::default().with_overrides(
            Some("from-cli".to_string()),
            Some("debian:12".to_string()),
        );
        assert_eq!(config.sandbox.name, "from-cli");
        assert_eq!(config.sandbox.image, "debian:12");
    }

    #[test]
    fn test_sandbox_settings_conversion() {
        let mut config = Config::default();
        config.agent.command_timeout_secs = 30;
        config.agent.poll_interval_ms = 250;
        config.sandbox.stop_timeout_secs = 5;

        let settings = config.sandbox_settings();
        assert_eq!(settings.command_timeout, Duration::from_secs(30));
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(settings.stop_grace, Duration::from_secs(5));
        assert_eq!(settings.volume_name(), "swea-data");
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("/usr/bin").unwrap(), "/usr/bin");

        if dirs::home_dir().is_some() {
            let expanded = expand_path("~/.codex").unwrap();
            assert!(!expanded.starts_with('~'));
            assert!(expanded.ends_with("/.codex"));
        }
    }
}
