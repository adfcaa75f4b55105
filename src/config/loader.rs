use std::path::{Path, PathBuf};

use crate::error::StreamwatchError;

use super::env::expand_app_config;
use super::types::AppConfig;

/// Find the config file to load.
///
/// Precedence:
/// 1. `--config` CLI flag
/// 2. `STREAMWATCH_CONFIG` env var
/// 3. `./config/streamwatch.json` (project-level)
/// 4. `~/.streamwatch/config.json` (home-level)
pub fn discover_config_file(cli_config: Option<&str>) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = cli_config {
        candidates.push(PathBuf::from(path));
    }
    if let Ok(env_path) = std::env::var("STREAMWATCH_CONFIG") {
        candidates.push(PathBuf::from(env_path));
    }
    candidates.push(PathBuf::from("./config/streamwatch.json"));
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".streamwatch").join("config.json"));
    }
    candidates.into_iter().find(|p| p.exists())
}

/// Load a single config file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, StreamwatchError> {
    let content = std::fs::read_to_string(path).map_err(|e| StreamwatchError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Cannot read file: {}", e),
    })?;

    serde_json::from_str::<AppConfig>(&content).map_err(|e| StreamwatchError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Invalid JSON: {}", e),
    })
}

/// Apply `STREAMWATCH_CLIENT_ID` / `STREAMWATCH_CLIENT_SECRET` over the file values.
fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(id) = std::env::var("STREAMWATCH_CLIENT_ID") {
        if !id.is_empty() {
            config.client_id = Some(id);
        }
    }
    if let Ok(secret) = std::env::var("STREAMWATCH_CLIENT_SECRET") {
        if !secret.is_empty() {
            config.client_secret = Some(secret);
        }
    }
}

fn validate(config: &AppConfig, source: &Path) -> Result<(), StreamwatchError> {
    let invalid = |detail: String| StreamwatchError::ConfigError {
        path: source.to_path_buf(),
        detail,
    };
    if config.min_interval_ms == 0 || config.min_interval_ms > config.max_interval_ms {
        return Err(invalid(format!(
            "minIntervalMs ({}) must be positive and not exceed maxIntervalMs ({})",
            config.min_interval_ms, config.max_interval_ms
        )));
    }
    if config.history_limit == 0 {
        return Err(invalid("historyLimit must be at least 1".into()));
    }
    Ok(())
}

/// Load, expand and validate the configuration.
///
/// With no config file present the defaults are used, so credentials can
/// come from the environment alone.
pub fn load_config(cli_config: Option<&str>) -> Result<(AppConfig, PathBuf), StreamwatchError> {
    if let Some(path) = cli_config {
        if !Path::new(path).exists() {
            return Err(StreamwatchError::ConfigError {
                path: PathBuf::from(path),
                detail: "File does not exist".into(),
            });
        }
    }

    let (mut config, source) = match discover_config_file(cli_config) {
        Some(path) => (load_config_file(&path)?, path),
        None => {
            tracing::debug!("No config file found, using defaults");
            (AppConfig::default(), PathBuf::from("<defaults>"))
        }
    };

    expand_app_config(&mut config)?;
    apply_env_overrides(&mut config);
    validate(&config, &source)?;
    Ok((config, source))
}

/// Client id from a loaded config, or a config error naming the source.
pub fn require_client_id(config: &AppConfig, source: &Path) -> Result<String, StreamwatchError> {
    config
        .client_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StreamwatchError::ConfigError {
            path: source.to_path_buf(),
            detail: "clientId is not set (or set STREAMWATCH_CLIENT_ID)".into(),
        })
}
