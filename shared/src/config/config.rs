use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use crate::types::server_config::{AppConfig, ConfigError};

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Loading configuration from: {}", path);

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path);

    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: AppConfig = toml::from_str(&contents)?;

    info!("Configuration loaded successfully");
    debug!("Config: {:?}", config);

    validate_config(&config)?;

    info!("Config validated");

    Ok(config)
}

/// Load `path` when given and present, otherwise fall back to defaults.
pub fn load_config_or_default(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(p) if Path::new(p).exists() => load_config(p),
        Some(p) => Err(ConfigError::InvalidConfig(format!(
            "config file not found: {}",
            p
        ))),
        None => {
            info!("No configuration file given, using defaults");
            Ok(AppConfig::default())
        }
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.bind.is_empty() {
        return Err(ConfigError::InvalidConfig("bind cannot be empty".into()));
    }

    if config.server.port == 0 {
        return Err(ConfigError::InvalidConfig(
            "port must be greater than 0".into(),
        ));
    }

    if !config.server.event_path.starts_with('/') {
        return Err(ConfigError::InvalidConfig(
            "event_path must start with '/'".into(),
        ));
    }

    if config.server.max_subscribers == Some(0) {
        return Err(ConfigError::InvalidConfig(
            "max_subscribers must be greater than 0 when set".into(),
        ));
    }

    if config.server.idle_timeout_secs == 0 {
        return Err(ConfigError::InvalidConfig(
            "idle_timeout_secs must be greater than 0".into(),
        ));
    }

    if config.build.terminal_width < 20 {
        return Err(ConfigError::InvalidConfig(
            "terminal_width must be at least 20".into(),
        ));
    }

    let client = &config.client;
    if client.initial_backoff_ms == 0 || client.initial_backoff_ms > client.max_backoff_ms {
        return Err(ConfigError::InvalidConfig(
            "initial_backoff_ms must be in 1..=max_backoff_ms".into(),
        ));
    }

    Ok(())
}
