//! Templates synced into the sandbox.
//!
//! The codex config and `AGENTS.md` are read from the paths in `swea.toml`
//! when set, falling back to the embedded defaults.

use anyhow::{Context, Result};
use std::fs;
use tracing::{debug, warn};

use crate::config::{expand_path, TemplateConfig};

/// Default codex CLI `config.toml`.
pub(crate) const CODEX_CONFIG_TOML: &str = include_str!("codex_config.toml");

/// Default `AGENTS.md`.
pub(crate) const AGENTS_MD: &str = include_str!("agents.md");

/// Environment variable holding the secret injected into the codex config.
pub(crate) const DEFAULT_API_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Template texts handed to the sandbox, plus the secret for the config.
#[derive(Debug, Clone)]
pub struct Templates {
    pub codex_config: String,
    pub agents_md: String,
    /// Name of the variable whose `${NAME}` placeholder is substituted.
    pub api_key_var: String,
    pub api_key: Option<String>,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            codex_config: CODEX_CONFIG_TOML.to_string(),
            agents_md: AGENTS_MD.to_string(),
            api_key_var: DEFAULT_API_KEY_VAR.to_string(),
            api_key: None,
        }
    }
}

impl Templates {
    /// Reads the configured templates and picks up the secret from the environment.
    pub fn load(config: &TemplateConfig) -> Result<Self> {
        let codex_config = read_or_default(config.codex_config.as_deref(), CODEX_CONFIG_TOML)?;
        let agents_md = read_or_default(config.agents_md.as_deref(), AGENTS_MD)?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|value| !value.is_empty());

        Ok(Self {
            codex_config,
            agents_md,
            api_key_var: config.api_key_env.clone(),
            api_key,
        })
    }

    /// The codex config with the secret placeholder filled in.
    ///
    /// A missing secret is substituted with an empty string.
    pub fn render_codex_config(&self) -> String {
        let placeholder = format!("${{{}}}", self.api_key_var);
        let value = match &self.api_key {
            Some(key) => key.as_str(),
            None => {
                warn!(
                    "{} not found in environment, vibetest MCP may not work",
                    self.api_key_var
                );
                ""
            }
        };
        self.codex_config.replace(&placeholder, value)
    }
}

fn read_or_default(path: Option<&str>, default: &str) -> Result<String> {
    let Some(path) = path else {
        return Ok(default.to_string());
    };

    let path = expand_path(path)?;
    if !std::path::Path::new(&path).exists() {
        warn!("Template {} not found, using built-in default", path);
        return Ok(default.to_string());
    }

    debug!("Reading template {}", path);
    fs::read_to_string(&path).with_context(|| format!("Failed to read template: {path}"))
}
