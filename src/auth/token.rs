use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StreamwatchError;

/// Tokens are treated as expired this long before the server says so.
pub const EXPIRY_SAFETY_MARGIN_MS: i64 = 3_600_000;

/// Application credentials plus the last known access token.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub access_token: String,
    pub token_expires_at: DateTime<Utc>,
}

impl Credentials {
    /// Credentials with no usable token; the first request triggers a refresh.
    pub fn new(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            access_token: String::new(),
            token_expires_at: Utc::now(),
        }
    }

    /// Restore a token persisted earlier (`expires_at_ms` is epoch milliseconds).
    pub fn with_cached_token(
        mut self,
        access_token: Option<String>,
        expires_at_ms: Option<i64>,
    ) -> Self {
        if let Some(token) = access_token {
            self.access_token = token;
        }
        if let Some(at) = expires_at_ms.and_then(|ms| Utc.timestamp_millis_opt(ms).single()) {
            self.token_expires_at = at;
        }
        self
    }
}

/// Current access token and the instant it stops being usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStore {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenStore {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_empty() || now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn replace(&mut self, update: &TokenUpdate) {
        self.access_token = update.token.clone();
        self.expires_at = update.expires_at;
    }
}

/// Published after every successful refresh so the token can be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUpdate {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenUpdate {
    pub fn expires_at_ms(&self) -> i64 {
        self.expires_at.timestamp_millis()
    }
}

/// Raw client-credentials response from the token endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Expiry is `now + expires_in` minus the safety margin. A negative or
    /// unrepresentable lifetime is an [`StreamwatchError::AuthError`].
    pub fn into_update(self, now: DateTime<Utc>) -> Result<TokenUpdate, StreamwatchError> {
        let out_of_range = || {
            StreamwatchError::AuthError(format!(
                "token expiry out of range (expires_in = {})",
                self.expires_in
            ))
        };
        if self.expires_in < 0 {
            return Err(out_of_range());
        }
        let margin = Duration::milliseconds(EXPIRY_SAFETY_MARGIN_MS);
        let expires_at = Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .and_then(|at| at.checked_sub_signed(margin))
            .ok_or_else(out_of_range)?;
        Ok(TokenUpdate {
            token: self.access_token,
            expires_at,
        })
    }
}

/// Shortened token for log lines.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}…")
}
