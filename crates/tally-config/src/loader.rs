//! Configuration Loader
//!
//! Finds `tally.toml` and applies environment overrides on top of it.

use crate::project::{CommandConfig, OutputConfig, OutputFormat, ProjectConfig, RunnerConfig};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "tally.toml";

/// Configuration loader
///
/// Precedence, lowest first:
/// 1. Project config (tally.toml)
/// 2. Environment variables (TALLY_*)
/// 3. CLI flags (handled by caller)
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Skip environment overrides (used by tests and `--no-env` style callers)
    ignore_env: bool,
}

/// Loaded configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Project configuration with environment overrides applied
    pub project: ProjectConfig,

    /// Directory containing the tally.toml that was loaded
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Do not read TALLY_* environment variables
    pub fn without_env(mut self) -> Self {
        self.ignore_env = true;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find tally.toml. Without one, the
    /// defaults are used.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project) = self.find_project_config(start_dir)?;
        let project = self.apply_env_overrides(project)?;

        Ok(Config {
            project,
            project_root,
        })
    }

    /// Load configuration from a specific file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project = ProjectConfig::load_from_file(config_path)?;
        let project = self.apply_env_overrides(project)?;

        Ok(Config {
            project,
            project_root: config_path.parent().map(|p| p.to_path_buf()),
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Recognized: TALLY_DEFER_DELAY_MS, TALLY_OUTPUT_FORMAT, TALLY_FILTER
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if self.ignore_env {
            return Ok(config);
        }

        if let Ok(delay) = env::var("TALLY_DEFER_DELAY_MS") {
            let delay = delay
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: "TALLY_DEFER_DELAY_MS".to_string(),
                    reason: e.to_string(),
                })?;
            config
                .runner
                .get_or_insert_with(RunnerConfig::default)
                .defer_delay_ms = Some(delay);
        }

        if let Ok(filter) = env::var("TALLY_FILTER") {
            config
                .runner
                .get_or_insert_with(RunnerConfig::default)
                .default_filter = Some(filter);
        }

        if let Ok(format) = env::var("TALLY_OUTPUT_FORMAT") {
            let format = format.parse::<OutputFormat>()?;
            config
                .output
                .get_or_insert_with(OutputConfig::default)
                .format = Some(format);
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Delay between a report and the next test
    pub fn defer_delay(&self) -> Duration {
        Duration::from_millis(self.project.defer_delay_ms().unwrap_or(0))
    }

    /// Filter used when the caller gives none
    pub fn default_filter(&self) -> Option<&str> {
        self.project.default_filter()
    }

    /// Effective output format (default: text)
    pub fn output_format(&self) -> OutputFormat {
        self.project.output_format().unwrap_or_default()
    }

    /// Whether colored output is enabled (default: true)
    pub fn color(&self) -> bool {
        self.project
            .output
            .as_ref()
            .and_then(|o| o.color)
            .unwrap_or(true)
    }

    /// Whether verbose output is enabled (default: false)
    pub fn verbose(&self) -> bool {
        self.project
            .output
            .as_ref()
            .and_then(|o| o.verbose)
            .unwrap_or(false)
    }

    /// Command bindings declared in tally.toml
    pub fn commands(&self) -> &[CommandConfig] {
        &self.project.commands
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    #[test]
    fn test_defaults_without_project() {
        let temp_dir = TempDir::new().unwrap();

        let config = ConfigLoader::new()
            .without_env()
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert_eq!(config.project_root(), None);
        assert_eq!(config.defer_delay(), Duration::ZERO);
        assert_eq!(config.output_format(), OutputFormat::Text);
        assert!(config.color());
        assert!(!config.verbose());
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[runner]
defer_delay_ms = 20
"#,
        );

        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let config = ConfigLoader::new()
            .without_env()
            .load_from_directory(&sub_dir)
            .unwrap();

        assert_eq!(config.defer_delay(), Duration::from_millis(20));
        assert_eq!(config.project_root(), Some(temp_dir.path()));
    }

    #[test]
    #[serial]
    fn test_env_override_delay() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[runner]
defer_delay_ms = 20
"#,
        );

        env::set_var("TALLY_DEFER_DELAY_MS", "7");
        let result = ConfigLoader::new().load_from_directory(temp_dir.path());
        env::remove_var("TALLY_DEFER_DELAY_MS");

        assert_eq!(result.unwrap().defer_delay(), Duration::from_millis(7));
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_delay() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("TALLY_DEFER_DELAY_MS", "soon");
        let result = ConfigLoader::new().load_from_directory(temp_dir.path());
        env::remove_var("TALLY_DEFER_DELAY_MS");

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    #[serial]
    fn test_env_override_format_and_filter() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("TALLY_OUTPUT_FORMAT", "json");
        env::set_var("TALLY_FILTER", "timer");
        let result = ConfigLoader::new().load_from_directory(temp_dir.path());
        env::remove_var("TALLY_OUTPUT_FORMAT");
        env::remove_var("TALLY_FILTER");

        let config = result.unwrap();
        assert_eq!(config.output_format(), OutputFormat::Json);
        assert_eq!(config.default_filter(), Some("timer"));
    }

    #[test]
    fn test_load_from_specific_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_config_file(
            temp_dir.path(),
            r#"
[output]
color = false
"#,
        );

        let config = ConfigLoader::new().without_env().load_from_file(&path).unwrap();
        assert!(!config.color());
        assert_eq!(config.project_root(), Some(temp_dir.path()));
    }
}
