use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::collector::{CollectionQuery, PaginatedCollector};
use crate::api::dedupe::dedupe_by;
use crate::error::StreamwatchError;

/// A game category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub box_art_url: Option<String>,
}

/// One live broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_login: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub viewer_count: u64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Where listings come from. Implemented over HTTP by [`HelixClient`].
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Look up a category by exact name.
    async fn get_game(&self, name: &str) -> Result<Option<Game>, StreamwatchError>;

    /// All live streams for a category, one per broadcaster.
    async fn get_streams(&self, game_id: &str) -> Result<Vec<Stream>, StreamwatchError>;
}

/// Typed access to the `games` and `streams` resources.
#[derive(Debug)]
pub struct HelixClient {
    collector: PaginatedCollector,
}

impl HelixClient {
    pub fn new(collector: PaginatedCollector) -> Self {
        Self { collector }
    }

    pub fn collector(&self) -> &PaginatedCollector {
        &self.collector
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    resource: &str,
    record: Value,
) -> Result<T, StreamwatchError> {
    serde_json::from_value(record).map_err(|e| {
        StreamwatchError::ProtocolError(format!("Malformed '{resource}' record: {e}"))
    })
}

#[async_trait]
impl ListingSource for HelixClient {
    async fn get_game(&self, name: &str) -> Result<Option<Game>, StreamwatchError> {
        let query = CollectionQuery::new("games").param("name", name);
        let records = self.collector.collect(&query).await?;
        records
            .into_iter()
            .next()
            .map(|record| decode("games", record))
            .transpose()
    }

    async fn get_streams(&self, game_id: &str) -> Result<Vec<Stream>, StreamwatchError> {
        let query = CollectionQuery::new("streams").param("game_id", game_id);
        let records = self.collector.collect(&query).await?;
        dedupe_by(records, "user_id")
            .into_iter()
            .map(|record| decode("streams", record))
            .collect()
    }
}
