//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

/// Runner strategy selector.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunnerKind {
    /// Echo the expanded prompt back into the response cell.
    #[default]
    Echo,
    /// Pipe the conversation into an external program and stream its stdout.
    Command,
}

/// Runner configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub struct RunnerConfig {
    /// Which strategy to build.
    #[serde(default)]
    pub kind: RunnerKind,
    /// Program to spawn for the `command` runner.
    #[serde(default)]
    pub program: Option<String>,
    /// Arguments passed to `program`.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Language tags used for the user and assistant sides of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRoles {
    /// Tag given to cells that hold the next user turn.
    pub user: String,
    /// Tag given to response cells.
    pub assistant: String,
}

impl Default for CellRoles {
    fn default() -> Self {
        Self {
            user: default_user_role(),
            assistant: default_assistant_role(),
        }
    }
}

fn default_user_role() -> String {
    "user".into()
}

fn default_assistant_role() -> String {
    "assistant".into()
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Language tag for user cells.
    #[serde(default = "default_user_role")]
    pub user_role: String,
    /// Language tag for response cells.
    #[serde(default = "default_assistant_role")]
    pub assistant_role: String,
    /// Base directory for relative path templates when the host provides none.
    #[serde(default)]
    pub default_base_dir: Option<PathBuf>,
    /// Runner strategy settings.
    #[serde(default)]
    pub runner: RunnerConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            user_role: default_user_role(),
            assistant_role: default_assistant_role(),
            default_base_dir: None,
            runner: RunnerConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Role tags as a standalone value for the orchestrator.
    #[must_use]
    pub fn roles(&self) -> CellRoles {
        CellRoles {
            user: self.user_role.clone(),
            assistant: self.assistant_role.clone(),
        }
    }

    /// Base directory for template resolution, preferring the host's value.
    #[must_use]
    pub fn resolve_base_dir(&self, host_base_dir: Option<PathBuf>) -> PathBuf {
        host_base_dir
            .or_else(|| self.default_base_dir.clone())
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn validate(&self) -> Result<()> {
        if self.user_role.trim().is_empty() || self.assistant_role.trim().is_empty() {
            return Err(AppError::Config("role tags must not be empty".into()));
        }

        if self.user_role == self.assistant_role {
            return Err(AppError::Config(
                "user_role and assistant_role must differ".into(),
            ));
        }

        if self.runner.kind == RunnerKind::Command
            && self.runner.program.as_deref().is_none_or(str::is_empty)
        {
            return Err(AppError::Config(
                "runner.program is required for the command runner".into(),
            ));
        }

        Ok(())
    }
}
