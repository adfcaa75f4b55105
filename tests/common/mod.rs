pub mod http_mock;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use streamwatch::{Credentials, PaginatedCollector, TokenLifecycleManager};
use wiremock::MockServer;

/// Token manager holding `token`, usable for another hour unless `expired`.
#[allow(dead_code)]
pub fn auth_manager(server: &MockServer, token: &str, expired: bool) -> Arc<TokenLifecycleManager> {
    let expires_at = if expired {
        Utc::now() - ChronoDuration::minutes(1)
    } else {
        Utc::now() + ChronoDuration::hours(1)
    };
    let credentials = Credentials::new("test-client", Some("test-secret".into()))
        .with_cached_token(Some(token.into()), Some(expires_at.timestamp_millis()));
    let url = format!("{}{}", server.uri(), http_mock::TOKEN_PATH);
    Arc::new(TokenLifecycleManager::new(credentials, &url))
}

/// Collector against the mock helix base with a short throttle.
#[allow(dead_code)]
pub fn collector(server: &MockServer, auth: Arc<TokenLifecycleManager>) -> PaginatedCollector {
    let base = format!("{}{}", server.uri(), http_mock::HELIX_PATH);
    PaginatedCollector::new(auth, &base).with_throttle(Duration::from_millis(5))
}

/// Temp dir holding a config that points every endpoint at `server`.
#[allow(dead_code)]
pub fn temp_config(server: &MockServer) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config = serde_json::json!({
        "clientId": "test-client",
        "clientSecret": "test-secret",
        "authUrl": format!("{}{}", server.uri(), http_mock::TOKEN_PATH),
        "apiBaseUrl": format!("{}{}", server.uri(), http_mock::HELIX_PATH),
        "throttleMs": 0,
        "settingsPath": dir.path().join("settings.json"),
    });
    let path = dir.path().join("streamwatch.json");
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    (dir, path)
}
