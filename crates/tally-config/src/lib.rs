//! Tally Configuration System
//!
//! Loads `tally.toml`, validates it, and applies environment overrides.
//!
//! # Configuration Hierarchy
//!
//! Later sources override earlier ones:
//! 1. Project config (`tally.toml`, found by walking up from the start directory)
//! 2. Environment variables (`TALLY_*`)
//! 3. CLI flags (applied by the caller)
//!
//! # Example
//!
//! ```no_run
//! use tally_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("defer delay: {:?}", config.defer_delay());
//! ```

pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use loader::{Config, ConfigLoader, CONFIG_FILE_NAME};
pub use project::{CommandConfig, OutputConfig, OutputFormat, ProjectConfig, RunnerConfig};
