//! Configuration loader with multi-source merging

use crate::{FleetEdgeConfig, Paths, Result};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    /// Replaces the process environment when set.
    env_source: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "FLEETEDGE".to_string(),
            env_source: None,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "FLEETEDGE")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read environment overrides from `vars` instead of the process environment
    pub fn with_env_source(mut self, vars: HashMap<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<FleetEdgeConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = FleetEdgeConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/fleetedge/config.toml)
        let paths = Paths::new();
        if let Ok(user_config_file) = paths.user_config_file() {
            if user_config_file.exists() {
                builder = builder.add_source(
                    config::File::from(user_config_file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        // 3. Project config (fleetedge.toml)
        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Local config (fleetedge.local.toml, gitignored)
        let local_config_file = Paths::local_config_file(&self.project_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (FLEETEDGE_SECTION__KEY)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env_source),
        );

        let mut fleetedge_config: FleetEdgeConfig = builder.build()?.try_deserialize()?;
        fleetedge_config.validate()?;
        fleetedge_config.resolve_paths(&self.project_dir);

        Ok(fleetedge_config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn isolated(project_dir: &Path) -> ConfigLoader {
        ConfigLoader::new()
            .with_project_dir(project_dir)
            .with_env_source(HashMap::new())
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = isolated(temp_dir.path())
            .load()
            .expect("Failed to load config");

        assert_eq!(config.jit.max_duration_hours, 24);
        assert_eq!(config.store.history_depth, 16);
        assert!(config.store.policy_file.is_none());
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[evaluator]
enforce_action_catalog = false

[store]
history_depth = 4
policy_file = "policies.json"

[jit]
max_duration_hours = 12
"#;
        fs::write(project_dir.join("fleetedge.toml"), config_content)
            .expect("Failed to write config");

        let config = isolated(project_dir).load().expect("Failed to load config");

        assert!(!config.evaluator.enforce_action_catalog);
        assert_eq!(config.store.history_depth, 4);
        assert_eq!(config.jit.max_duration_hours, 12);
        assert_eq!(
            config.store.policy_file,
            Some(project_dir.join("policies.json"))
        );
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("fleetedge.toml"),
            "[logging]\nlevel = \"warn\"\n",
        )
        .expect("Failed to write project config");
        fs::write(
            project_dir.join("fleetedge.local.toml"),
            "[logging]\nlevel = \"debug\"\n",
        )
        .expect("Failed to write local config");

        let config = isolated(project_dir).load().expect("Failed to load config");

        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_overrides_files() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        fs::write(
            project_dir.join("fleetedge.toml"),
            "[jit]\nmax_duration_hours = 12\n",
        )
        .expect("Failed to write config");

        let vars = HashMap::from([
            (
                "FLEETEDGE_JIT__MAX_DURATION_HOURS".to_string(),
                "6".to_string(),
            ),
            (
                "FLEETEDGE_EVALUATOR__ENFORCE_ACTION_CATALOG".to_string(),
                "false".to_string(),
            ),
        ]);
        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .with_env_source(vars)
            .load()
            .expect("Failed to load config");

        assert_eq!(config.jit.max_duration_hours, 6);
        assert!(!config.evaluator.enforce_action_catalog);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        fs::write(
            project_dir.join("fleetedge.toml"),
            "[jit]\nsweep_interval_secs = 0\n",
        )
        .expect("Failed to write config");

        assert!(isolated(project_dir).load().is_err());
    }
}
