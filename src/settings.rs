use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::auth::{RefreshCallback, TokenUpdate};
use crate::error::StreamwatchError;

fn default_game_name() -> String {
    "Diablo II: Lord of Destruction".to_string()
}

fn default_update_interval() -> String {
    "10m".to_string()
}

fn default_auto_update() -> bool {
    true
}

fn default_title_filter() -> String {
    "median ?(xl)?|mxl".to_string()
}

fn default_display_max() -> usize {
    5
}

/// User-adjustable state that survives restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<i64>,
    #[serde(default = "default_game_name")]
    pub game_name: String,
    #[serde(default = "default_update_interval")]
    pub update_interval: String,
    #[serde(default = "default_auto_update")]
    pub auto_update: bool,
    #[serde(default = "default_title_filter")]
    pub title_filter: String,
    #[serde(default = "default_display_max")]
    pub display_max: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            access_token: None,
            token_expires_at: None,
            game_name: default_game_name(),
            update_interval: default_update_interval(),
            auto_update: default_auto_update(),
            title_filter: default_title_filter(),
            display_max: default_display_max(),
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing or unreadable file yields defaults.
    pub fn load(path: &Path) -> Self {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No settings at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                tracing::warn!("Cannot read settings {}: {e}, using defaults", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str(&data) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Corrupt settings {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StreamwatchError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_string_pretty(self).map_err(|e| StreamwatchError::ConfigError {
            path: path.to_path_buf(),
            detail: format!("Failed to serialize settings: {e}"),
        })?;
        std::fs::write(path, data)?;
        Ok(())
    }
}

/// Shared, file-backed [`Settings`].
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    inner: Mutex<Settings>,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = Settings::load(&path);
        Self {
            path,
            inner: Mutex::new(settings),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Settings> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> Settings {
        self.lock().clone()
    }

    /// Apply `f` to the settings without saving.
    pub fn update<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn save(&self) -> Result<(), StreamwatchError> {
        let settings = self.snapshot();
        settings.save(&self.path)?;
        tracing::debug!("Settings saved to {}", self.path.display());
        Ok(())
    }

    /// Record a refreshed token and persist it.
    pub fn record_token(&self, update: &TokenUpdate) -> Result<(), StreamwatchError> {
        self.update(|s| {
            s.access_token = Some(update.token.clone());
            s.token_expires_at = Some(update.expires_at_ms());
        });
        self.save()
    }

    /// A refresh callback that writes every new token through to disk.
    pub fn token_sink(self: &Arc<Self>) -> RefreshCallback {
        let store = Arc::clone(self);
        Arc::new(move |update: &TokenUpdate| {
            if let Err(e) = store.record_token(update) {
                tracing::error!("Failed to persist refreshed token: {e}");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.game_name, "Diablo II: Lord of Destruction");
        assert_eq!(s.update_interval, "10m");
        assert!(s.auto_update);
        assert_eq!(s.title_filter, "median ?(xl)?|mxl");
        assert_eq!(s.display_max, 5);
        assert!(s.access_token.is_none());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let s: Settings = serde_json::from_str(r#"{"gameName": "Path of Exile"}"#).unwrap();
        assert_eq!(s.game_name, "Path of Exile");
        assert_eq!(s.display_max, 5);
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(&dir.path().join("nope.json"));
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn load_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            update_interval: "2h".into(),
            ..Settings::default()
        };
        settings.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"updateInterval\": \"2h\""));
        assert!(!text.contains("accessToken"));
        assert_eq!(Settings::load(&path).update_interval, "2h");
    }

    #[test]
    fn token_sink_persists_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = Arc::new(SettingsStore::open(&path));
        let sink = store.token_sink();

        let expires_at = Utc.timestamp_millis_opt(1_900_000_000_000).unwrap();
        sink(&TokenUpdate {
            token: "fresh-token".into(),
            expires_at,
        });

        let reloaded = Settings::load(&path);
        assert_eq!(reloaded.access_token.as_deref(), Some("fresh-token"));
        assert_eq!(reloaded.token_expires_at, Some(1_900_000_000_000));
        assert_eq!(store.snapshot().access_token.as_deref(), Some("fresh-token"));
    }

    #[test]
    fn update_does_not_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path);
        store.update(|s| s.display_max = 9);
        assert!(!path.exists());
        store.save().unwrap();
        assert_eq!(Settings::load(&path).display_max, 9);
    }
}
