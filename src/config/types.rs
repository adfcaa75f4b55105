use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::collector::DEFAULT_API_BASE_URL;
use crate::auth::manager::DEFAULT_TOKEN_URL;
use crate::schedule::SchedulerConfig;

fn default_auth_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_throttle_ms() -> u64 {
    1_000
}

fn default_min_interval_ms() -> u64 {
    60_000
}

fn default_max_interval_ms() -> u64 {
    86_400_000
}

fn default_history_limit() -> usize {
    25
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    /// Maximum number of went-offline streams kept in history.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub settings_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            auth_url: default_auth_url(),
            api_base_url: default_api_base_url(),
            throttle_ms: default_throttle_ms(),
            min_interval_ms: default_min_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            history_limit: default_history_limit(),
            settings_path: None,
        }
    }
}

impl AppConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    /// Scheduler bounds from this config with the given starting interval.
    pub fn scheduler_config(&self, interval_ms: u64) -> SchedulerConfig {
        SchedulerConfig {
            interval_ms,
            min_bound_ms: self.min_interval_ms,
            max_bound_ms: self.max_interval_ms,
        }
    }

    /// Configured settings file, or `~/.streamwatch/settings.json`.
    pub fn settings_path(&self) -> PathBuf {
        self.settings_path.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".streamwatch")
                .join("settings.json")
        })
    }
}
