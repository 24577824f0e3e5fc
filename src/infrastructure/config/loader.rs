use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Prefix for environment overrides; nested keys are separated by `__`.
const ENV_PREFIX: &str = "DSALAB_";

/// Project-local files merged by [`ConfigLoader::load`], lowest precedence first.
const DEFAULT_FILES: [&str; 2] = [".dsalab/config.yaml", ".dsalab/local.yaml"];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["json", "pretty"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("logging.level '{0}' is not one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("logging.format '{0}' is not one of json, pretty")]
    InvalidLogFormat(String),

    #[error("database.path must not be empty")]
    EmptyDatabasePath,

    #[error("database.max_connections must be at least 1, got {0}")]
    InvalidMaxConnections(u32),

    #[error("server.port must not be 0")]
    InvalidPort,

    #[error("provisioning.orphan_timeout_secs must be at least 1")]
    InvalidOrphanTimeout,

    #[error("{0}")]
    ValidationFailed(String),
}

/// Loads [`Config`] from serialized defaults, YAML files and `DSALAB_*`
/// environment variables, in increasing precedence.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then `.dsalab/config.yaml`, then `.dsalab/local.yaml`, then
    /// the environment. Missing files are skipped.
    pub fn load() -> Result<Config> {
        let files: Vec<PathBuf> = DEFAULT_FILES.iter().map(PathBuf::from).collect();
        Self::extract(&files).context("Failed to load configuration from .dsalab/")
    }

    /// Defaults, then `path`, then the environment. The file must exist.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        anyhow::ensure!(path.exists(), "Config file not found: {}", path.display());
        Self::extract(&[path.to_path_buf()])
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }

    fn extract(files: &[PathBuf]) -> Result<Config> {
        let figment = files.iter().fold(
            Figment::from(Serialized::defaults(Config::default())),
            |figment, file| figment.merge(Yaml::file(file)),
        );
        let config: Config = figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Reject settings the services cannot run with.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let database = &config.database;
        if database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if database.max_connections < 1 {
            return Err(ConfigError::InvalidMaxConnections(database.max_connections));
        }

        let logging = &config.logging;
        if !LOG_LEVELS.contains(&logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(logging.level.clone()));
        }
        if !LOG_FORMATS.contains(&logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(logging.format.clone()));
        }

        if config.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let provisioning = &config.provisioning;
        if provisioning.orphan_timeout_secs == 0 {
            return Err(ConfigError::InvalidOrphanTimeout);
        }
        if provisioning.config_path.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "provisioning.config_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
