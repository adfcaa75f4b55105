use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::auth::TokenLifecycleManager;
use crate::error::StreamwatchError;

pub const DEFAULT_API_BASE_URL: &str = "https://api.twitch.tv/helix";

/// Largest page the resource endpoint will return.
pub const PAGE_SIZE_CAP: usize = 100;

/// Pause between consecutive page requests.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(1000);

/// A resource name plus its query parameters. `first` and `after` are
/// owned by the collector and ignored if supplied here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    resource: String,
    params: Vec<(String, String)>,
}

impl CollectionQuery {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn page_size_cap(&self) -> usize {
        PAGE_SIZE_CAP
    }
}

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    data: Vec<Value>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    cursor: Option<String>,
}

impl PageEnvelope {
    fn cursor(&mut self) -> Option<String> {
        self.pagination
            .take()
            .and_then(|p| p.cursor)
            .filter(|c| !c.is_empty())
    }
}

/// Fetches every page of a cursor-paginated resource.
///
/// Pages are requested strictly one after another with a throttle delay
/// between them. A 401 triggers one token refresh and one retry of the same
/// page; any other failure aborts the whole collection.
pub struct PaginatedCollector {
    client: reqwest::Client,
    base_url: String,
    auth: Arc<TokenLifecycleManager>,
    throttle: Duration,
}

impl std::fmt::Debug for PaginatedCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedCollector")
            .field("base_url", &self.base_url)
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}

impl PaginatedCollector {
    pub fn new(auth: Arc<TokenLifecycleManager>, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            throttle: DEFAULT_THROTTLE,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn auth(&self) -> &Arc<TokenLifecycleManager> {
        &self.auth
    }

    /// Collect all records for `query`, in page order.
    pub async fn collect(&self, query: &CollectionQuery) -> Result<Vec<Value>, StreamwatchError> {
        let mut token = self.auth.ensure_valid_token().await?;
        let mut records: Vec<Value> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if pages > 0 {
                tokio::time::sleep(self.throttle).await;
            }

            let mut page = match self.fetch_page(query, cursor.as_deref(), &token).await {
                Ok(page) => page,
                Err(e) if e.is_unauthorized() => {
                    tracing::warn!(
                        "'{}' page {} rejected the access token, refreshing once",
                        query.resource(),
                        pages + 1
                    );
                    token = self.auth.refresh_rejected(&token).await?;
                    tokio::time::sleep(self.throttle).await;
                    self.fetch_page(query, cursor.as_deref(), &token).await?
                }
                Err(e) => return Err(e),
            };

            pages += 1;
            let count = page.data.len();
            tracing::debug!("'{}' page {pages}: {count} records", query.resource());
            records.append(&mut page.data);

            if count < PAGE_SIZE_CAP {
                break;
            }
            match page.cursor() {
                Some(next) => cursor = Some(next),
                None => {
                    tracing::debug!("Full page without cursor, treating as last page");
                    break;
                }
            }
        }

        tracing::debug!(
            "Collected {} '{}' records over {pages} pages",
            records.len(),
            query.resource()
        );
        Ok(records)
    }

    async fn fetch_page(
        &self,
        query: &CollectionQuery,
        cursor: Option<&str>,
        token: &str,
    ) -> Result<PageEnvelope, StreamwatchError> {
        let url = format!("{}/{}", self.base_url, query.resource());
        let page_size = PAGE_SIZE_CAP.to_string();

        let mut params: Vec<(&str, &str)> = query
            .params()
            .iter()
            .filter(|(k, _)| k != "first" && k != "after")
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        params.push(("first", page_size.as_str()));
        if let Some(after) = cursor {
            params.push(("after", after));
        }

        let response = self
            .client
            .get(&url)
            .header("Client-Id", self.auth.client_id())
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(|e| StreamwatchError::TransportError(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("GET {url} failed with {status}: {body}");
            return Err(StreamwatchError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| StreamwatchError::TransportError(Box::new(e)))?;
        serde_json::from_str::<PageEnvelope>(&body).map_err(|e| {
            StreamwatchError::ProtocolError(format!(
                "Unexpected '{}' response shape: {e}",
                query.resource()
            ))
        })
    }
}
