//! Configuration loading from disk and from the worker environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable carrying the validated config into a worker process.
pub const WORKER_CONFIG_ENV: &str = "WORKER_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WORKER_CONFIG is not set")]
    MissingWorkerConfig,

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a YAML or TOML file.
///
/// The format is picked by extension; anything other than `.toml` is read as YAML.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Serialize a validated config for a worker's environment.
pub fn encode_for_worker(config: &ProxyConfig) -> Result<String, ConfigError> {
    Ok(serde_json::to_string(config)?)
}

/// Read the config a master handed to this worker process.
///
/// Validated again so a worker never runs on a config the master would reject.
pub fn load_worker_config() -> Result<ProxyConfig, ConfigError> {
    let raw = std::env::var(WORKER_CONFIG_ENV).map_err(|_| ConfigError::MissingWorkerConfig)?;
    let config: ProxyConfig = serde_json::from_str(&raw)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
