use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::auth::token::{redact, Credentials, TokenResponse, TokenStore, TokenUpdate};
use crate::error::StreamwatchError;

pub const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// Receives every freshly issued token, typically to persist it.
pub type RefreshCallback = Arc<dyn Fn(&TokenUpdate) + Send + Sync>;

/// Owns the app access token and refreshes it through the
/// client-credentials grant.
///
/// The store lock is held for the whole refresh, so concurrent callers that
/// find the token expired wait for the one request already in flight and
/// then reuse its result. The refresh callback runs after the lock is
/// released.
pub struct TokenLifecycleManager {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
    store: Mutex<TokenStore>,
    on_refresh: Option<RefreshCallback>,
}

impl std::fmt::Debug for TokenLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLifecycleManager")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl TokenLifecycleManager {
    pub fn new(credentials: Credentials, token_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: token_url.to_string(),
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            store: Mutex::new(TokenStore::new(
                credentials.access_token,
                credentials.token_expires_at,
            )),
            on_refresh: None,
        }
    }

    /// Share an existing HTTP client instead of creating one.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn on_refresh(mut self, callback: RefreshCallback) -> Self {
        self.on_refresh = Some(callback);
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Snapshot of the stored token.
    pub async fn current(&self) -> TokenStore {
        self.store.lock().await.clone()
    }

    /// Return the stored token, refreshing it first when it has expired.
    pub async fn ensure_valid_token(&self) -> Result<String, StreamwatchError> {
        let mut store = self.store.lock().await;
        if !store.is_expired() {
            return Ok(store.access_token().to_string());
        }
        tracing::debug!("Access token expired at {}", store.expires_at());
        let update = self.refresh_locked(&mut store).await?;
        drop(store);
        Ok(self.publish(update))
    }

    /// Unconditionally request a new token.
    pub async fn refresh(&self) -> Result<String, StreamwatchError> {
        let mut store = self.store.lock().await;
        let update = self.refresh_locked(&mut store).await?;
        drop(store);
        Ok(self.publish(update))
    }

    /// Replace a token the resource server rejected.
    ///
    /// If another caller already swapped in a different, unexpired token
    /// while this one waited for the lock, that token is returned instead of
    /// issuing a second refresh.
    pub async fn refresh_rejected(&self, rejected: &str) -> Result<String, StreamwatchError> {
        let mut store = self.store.lock().await;
        if store.access_token() != rejected && !store.is_expired() {
            tracing::debug!("Token already replaced by a concurrent refresh");
            return Ok(store.access_token().to_string());
        }
        let update = self.refresh_locked(&mut store).await?;
        drop(store);
        Ok(self.publish(update))
    }

    /// Request and store a new token. The caller holds the store lock.
    async fn refresh_locked(&self, store: &mut TokenStore) -> Result<TokenUpdate, StreamwatchError> {
        let update = self.request_token().await?;
        store.replace(&update);
        tracing::info!(
            "Access token {} refreshed, expires at {}",
            redact(&update.token),
            update.expires_at
        );
        if store.is_expired() {
            tracing::warn!("Token lifetime is shorter than the expiry safety margin");
        }
        Ok(update)
    }

    /// Hand a new token to the refresh callback. Called with the store
    /// lock released.
    fn publish(&self, update: TokenUpdate) -> String {
        if let Some(ref callback) = self.on_refresh {
            callback(&update);
        }
        update.token
    }

    async fn request_token(&self) -> Result<TokenUpdate, StreamwatchError> {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("grant_type", "client_credentials"),
        ];
        if let Some(ref secret) = self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let resp = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| StreamwatchError::AuthError(format!("Token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("Token endpoint answered {status}: {body}");
            return Err(StreamwatchError::AuthError(format!(
                "Token request failed with status {status}: {body}"
            )));
        }

        let token_resp: TokenResponse = resp.json().await.map_err(|e| {
            StreamwatchError::AuthError(format!("Failed to parse token response: {e}"))
        })?;

        token_resp.into_update(Utc::now())
    }
}
