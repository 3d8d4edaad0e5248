// src/config/loader.rs
//! Layered configuration loader
//!
//! Sources are merged in order: built-in defaults, each configuration file
//! that exists, then `MYO_DAQ__*` environment variables.

use crate::config::{constants::paths, DaqConfig};
use ::config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// None of the configured paths exists
    #[error("configuration file not found: {0}")]
    FileNotFound(String),
    /// The file or environment could not be deserialized
    #[error("configuration parse error: {0}")]
    ParseError(String),
    /// Values parsed but failed validation
    #[error("configuration rejected: {0}")]
    ValidationError(String),
    /// Reading or writing a file failed
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<::config::ConfigError> for ConfigError {
    fn from(err: ::config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Loads [`DaqConfig`] from files and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader reading `myo_daq.toml` from the working directory and the
    /// `MYO_DAQ` environment prefix
    pub fn new() -> Self {
        Self {
            config_paths: vec![PathBuf::from(paths::DEFAULT_CONFIG_FILE)],
            env_prefix: Some(paths::ENV_PREFIX.to_string()),
        }
    }

    /// Create loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            ..Self::new()
        }
    }

    /// Override the environment prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Ignore the environment entirely
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Merge every source and validate the result
    pub fn load(&self) -> Result<DaqConfig, ConfigError> {
        let mut builder = Config::builder();

        for path in &self.config_paths {
            debug!(path = %path.display(), exists = path.exists(), "config source");
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml).required(false));
        }

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .separator(paths::ENV_SEPARATOR)
                    .list_separator(",")
                    .with_list_parse_key("channels")
                    .try_parsing(true),
            );
        }

        let config: DaqConfig = builder.build()?.try_deserialize()?;
        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(config)
    }

    /// Load a single file that must exist, without environment overrides
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<DaqConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<DaqConfig, ConfigError> {
        let config: DaqConfig = toml::from_str(content)?;
        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(config)
    }

    /// Write `config` as pretty TOML
    pub fn export<P: AsRef<Path>>(config: &DaqConfig, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
