use std::sync::Arc;

use crate::api::{HelixClient, PaginatedCollector};
use crate::auth::{Credentials, TokenLifecycleManager};
use crate::config::{load_config, require_client_id, AppConfig};
use crate::error::StreamwatchError;
use crate::monitor::StreamMonitor;
use crate::settings::SettingsStore;

/// Everything a command needs, wired from config and persisted settings.
#[derive(Debug)]
pub struct Session {
    pub config: AppConfig,
    pub settings: Arc<SettingsStore>,
    pub auth: Arc<TokenLifecycleManager>,
    pub monitor: Arc<StreamMonitor>,
}

impl Session {
    pub fn open(config_path: Option<&str>) -> Result<Self, StreamwatchError> {
        let (config, source) = load_config(config_path)?;
        tracing::debug!("Using config from {}", source.display());
        let client_id = require_client_id(&config, &source)?;
        Self::from_config(config, client_id)
    }

    pub fn from_config(config: AppConfig, client_id: String) -> Result<Self, StreamwatchError> {
        let settings = Arc::new(SettingsStore::open(config.settings_path()));
        let saved = settings.snapshot();

        let credentials = Credentials::new(client_id, config.client_secret.clone())
            .with_cached_token(saved.access_token.clone(), saved.token_expires_at);
        let auth = Arc::new(
            TokenLifecycleManager::new(credentials, &config.auth_url)
                .on_refresh(settings.token_sink()),
        );

        let collector = PaginatedCollector::new(Arc::clone(&auth), &config.api_base_url)
            .with_throttle(config.throttle());
        let source = Arc::new(HelixClient::new(collector));
        let monitor = Arc::new(StreamMonitor::new(
            source,
            saved.game_name.clone(),
            &saved.title_filter,
            config.history_limit,
        )?);

        Ok(Self {
            config,
            settings,
            auth,
            monitor,
        })
    }

    /// Copy the monitor's current game and filter into settings and save.
    pub fn persist(&self) -> Result<(), StreamwatchError> {
        let game_name = self.monitor.game_name();
        let title_filter = self.monitor.title_filter();
        self.settings.update(|s| {
            s.game_name = game_name;
            s.title_filter = title_filter;
        });
        self.settings.save()
    }
}
