//! Configuration management for `FleetEdge`
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (`FLEETEDGE_*` prefix, highest precedence)
//! 2. fleetedge.local.toml (gitignored, local overrides)
//! 3. fleetedge.toml (git-tracked, project config)
//! 4. ~/.config/fleetedge/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! Nested keys are separated by a double underscore in environment
//! variables, e.g. `FLEETEDGE_JIT__MAX_DURATION_HOURS=12`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main `FleetEdge` configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetEdgeConfig {
    pub evaluator: EvaluatorConfig,
    pub store: StoreConfig,
    pub jit: JitConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Reject actions missing from the action catalog before evaluation.
    pub enforce_action_catalog: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            enforce_action_catalog: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Previous versions kept per policy.
    pub history_depth: usize,
    /// JSON policy file loaded at startup instead of the built-in presets.
    pub policy_file: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_depth: 16,
            policy_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitConfig {
    pub max_duration_hours: u32,
    pub default_duration_hours: u32,
    pub sweep_interval_secs: u64,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            max_duration_hours: 24,
            default_duration_hours: 2,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl FleetEdgeConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Load a single TOML file, ignoring every other source
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.jit.max_duration_hours == 0 {
            return Err(ConfigError::ValidationError(
                "jit.max_duration_hours must be at least 1".to_string(),
            ));
        }
        if self.jit.default_duration_hours == 0
            || self.jit.default_duration_hours > self.jit.max_duration_hours
        {
            return Err(ConfigError::ValidationError(format!(
                "jit.default_duration_hours must be between 1 and {}",
                self.jit.max_duration_hours
            )));
        }
        if self.jit.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "jit.sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }
        Ok(())
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        if let Some(policy_file) = &self.store.policy_file {
            if policy_file.is_relative() {
                self.store.policy_file = Some(base_dir.as_ref().join(policy_file));
            }
        }
    }
}
