//! Project Configuration (tally.toml)
//!
//! Handles project-level configuration stored in `tally.toml`.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Upper bound for the delay between tests, in milliseconds
pub const MAX_DEFER_DELAY_MS: u64 = 60_000;

/// Project configuration from tally.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Runner behavior
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<RunnerConfig>,

    /// Output settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    /// Extra command bindings (`[[commands]]`)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandConfig>,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Delay between a report and the next test, in milliseconds (default: 0,
    /// which yields once instead of sleeping)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defer_delay_ms: Option<u64>,

    /// Filter applied when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_filter: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output format (default: text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,

    /// Colorize PASSED/FAILED tokens (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,

    /// Show elapsed time for every reported test
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
}

/// How run output is printed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::InvalidValue {
                field: "output.format".to_string(),
                reason: format!("must be 'text' or 'json', got '{}'", other),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// A command name bound to a test namespace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    /// Command typed at the prompt
    pub name: String,

    /// Namespace whose suite the command runs
    pub namespace: String,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(delay) = self.runner.as_ref().and_then(|r| r.defer_delay_ms) {
            if delay > MAX_DEFER_DELAY_MS {
                return Err(ConfigError::InvalidValue {
                    field: "runner.defer_delay_ms".to_string(),
                    reason: format!("must be at most {}, got {}", MAX_DEFER_DELAY_MS, delay),
                });
            }
        }

        let mut seen = HashSet::new();
        for command in &self.commands {
            validate_command(command)?;
            if !seen.insert(command.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "command '{}' is defined more than once",
                    command.name
                )));
            }
        }

        Ok(())
    }

    /// Get the configured delay between tests, if present
    pub fn defer_delay_ms(&self) -> Option<u64> {
        self.runner.as_ref().and_then(|r| r.defer_delay_ms)
    }

    /// Get the default filter, if present
    pub fn default_filter(&self) -> Option<&str> {
        self.runner.as_ref().and_then(|r| r.default_filter.as_deref())
    }

    /// Get the output format, if present
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output.as_ref().and_then(|o| o.format)
    }
}

/// Command names are split on whitespace at the prompt, so they cannot
/// contain any.
fn validate_command(command: &CommandConfig) -> ConfigResult<()> {
    if command.name.is_empty() || command.name.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidValue {
            field: "commands.name".to_string(),
            reason: format!("'{}' must be a single non-empty word", command.name),
        });
    }
    if command.namespace.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "commands.namespace".to_string(),
            reason: format!("namespace for '{}' cannot be empty", command.name),
        });
    }
    Ok(())
}
