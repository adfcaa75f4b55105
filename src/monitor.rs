use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::api::{Game, ListingSource, Stream};
use crate::error::StreamwatchError;

/// Title filter installed after switching category.
pub const MATCH_ALL_FILTER: &str = ".";

/// Compile a title filter. Matching is case-insensitive.
pub fn compile_title_filter(pattern: &str) -> Result<Regex, StreamwatchError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| StreamwatchError::ValidationError(format!("title filter '{pattern}': {e}")))
}

/// A stream that dropped out of the listing, stamped when that was noticed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfflineStream {
    #[serde(flatten)]
    pub stream: Stream,
    pub ended_at: DateTime<Utc>,
}

/// Point-in-time copy of the monitor state.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub game_name: String,
    pub game: Option<Game>,
    pub title_filter: String,
    pub streams: Vec<Stream>,
    pub history: Vec<OfflineStream>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl MonitorSnapshot {
    /// Streams whose title passes the filter, most viewers first, at most `max`.
    pub fn visible_streams(&self, max: usize) -> Vec<&Stream> {
        let filter = compile_title_filter(&self.title_filter).ok();
        let mut visible: Vec<&Stream> = self
            .streams
            .iter()
            .filter(|s| filter.as_ref().map_or(true, |re| re.is_match(&s.title)))
            .collect();
        visible.sort_by(|a, b| b.viewer_count.cmp(&a.viewer_count));
        visible.truncate(max);
        visible
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated { live: usize, went_offline: usize },
    /// Another cycle was already in progress.
    Skipped,
}

#[derive(Debug)]
struct MonitorState {
    game_name: String,
    game: Option<Game>,
    title_filter: Regex,
    streams: Vec<Stream>,
    history: Vec<OfflineStream>,
    last_updated: Option<DateTime<Utc>>,
}

/// Keeps the live listing for one category current and remembers which
/// matching streams went offline.
pub struct StreamMonitor {
    source: Arc<dyn ListingSource>,
    state: Mutex<MonitorState>,
    cycle: tokio::sync::Mutex<()>,
    history_limit: usize,
}

impl std::fmt::Debug for StreamMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamMonitor")
            .field("history_limit", &self.history_limit)
            .finish_non_exhaustive()
    }
}

impl StreamMonitor {
    pub fn new(
        source: Arc<dyn ListingSource>,
        game_name: impl Into<String>,
        title_filter: &str,
        history_limit: usize,
    ) -> Result<Self, StreamwatchError> {
        let title_filter = compile_title_filter(title_filter)?;
        Ok(Self {
            source,
            state: Mutex::new(MonitorState {
                game_name: game_name.into(),
                game: None,
                title_filter,
                streams: Vec::new(),
                history: Vec::new(),
                last_updated: None,
            }),
            cycle: tokio::sync::Mutex::new(()),
            history_limit,
        })
    }

    fn state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let state = self.state();
        MonitorSnapshot {
            game_name: state.game_name.clone(),
            game: state.game.clone(),
            title_filter: state.title_filter.as_str().to_string(),
            streams: state.streams.clone(),
            history: state.history.clone(),
            last_updated: state.last_updated,
        }
    }

    pub fn game_name(&self) -> String {
        self.state().game_name.clone()
    }

    pub fn title_filter(&self) -> String {
        self.state().title_filter.as_str().to_string()
    }

    /// Replace the title filter. An invalid pattern leaves the old one in place.
    pub fn set_title_filter(&self, pattern: &str) -> Result<(), StreamwatchError> {
        let compiled = compile_title_filter(pattern)?;
        self.state().title_filter = compiled;
        tracing::info!("Title filter set to '{pattern}'");
        Ok(())
    }

    /// Run one fetch cycle, waiting for any cycle already in progress.
    pub async fn refresh(&self) -> Result<RefreshOutcome, StreamwatchError> {
        let _guard = self.cycle.lock().await;
        self.run_cycle().await
    }

    /// Run one fetch cycle unless another is in progress.
    pub async fn try_refresh(&self) -> Result<RefreshOutcome, StreamwatchError> {
        let Ok(_guard) = self.cycle.try_lock() else {
            tracing::warn!("Refresh already in progress, skipping this tick");
            return Ok(RefreshOutcome::Skipped);
        };
        self.run_cycle().await
    }

    /// Switch category and refresh. On success the title filter is reset to
    /// match everything; on failure the previous name is restored and the
    /// filter is left alone.
    pub async fn change_game(&self, name: &str) -> Result<RefreshOutcome, StreamwatchError> {
        let _guard = self.cycle.lock().await;
        let previous = std::mem::replace(&mut self.state().game_name, name.to_string());
        match self.run_cycle().await {
            Ok(outcome) => {
                self.state().title_filter = compile_title_filter(MATCH_ALL_FILTER)?;
                tracing::info!("Title filter reset to '{MATCH_ALL_FILTER}'");
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!("Switching to '{name}' failed, keeping '{previous}': {e}");
                self.state().game_name = previous;
                Err(e)
            }
        }
    }

    async fn resolve_game(&self) -> Result<Game, StreamwatchError> {
        let (wanted, cached) = {
            let state = self.state();
            (state.game_name.clone(), state.game.clone())
        };
        if let Some(game) = cached {
            if game.name.to_lowercase() == wanted.to_lowercase() {
                tracing::debug!("Using cached category '{}'", game.name);
                return Ok(game);
            }
        }

        let game = self
            .source
            .get_game(&wanted)
            .await?
            .ok_or_else(|| StreamwatchError::NotFound(wanted.clone()))?;
        tracing::info!("Category cached: '{}' ({})", game.name, game.id);

        let mut state = self.state();
        state.game_name = game.name.clone();
        state.game = Some(game.clone());
        Ok(game)
    }

    async fn run_cycle(&self) -> Result<RefreshOutcome, StreamwatchError> {
        let game = self.resolve_game().await?;
        let streams = self.source.get_streams(&game.id).await?;
        tracing::info!("{} '{}' streams cached", streams.len(), game.name);

        let now = Utc::now();
        let mut state = self.state();
        let live_ids: HashSet<&str> = streams.iter().map(|s| s.user_id.as_str()).collect();
        let went_offline: Vec<OfflineStream> = state
            .streams
            .iter()
            .filter(|prev| !live_ids.contains(prev.user_id.as_str()))
            .filter(|prev| state.title_filter.is_match(&prev.title))
            .map(|prev| OfflineStream {
                stream: prev.clone(),
                ended_at: now,
            })
            .collect();

        let offline_count = went_offline.len();
        if offline_count > 0 {
            tracing::info!("{offline_count} matching streams went offline");
        }
        let mut history = went_offline;
        history.append(&mut state.history);
        history.truncate(self.history_limit);

        let live = streams.len();
        state.history = history;
        state.streams = streams;
        state.last_updated = Some(now);

        Ok(RefreshOutcome::Updated {
            live,
            went_offline: offline_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stream(user_id: &str, title: &str, viewers: u64) -> Stream {
        serde_json::from_value(serde_json::json!({
            "user_id": user_id,
            "user_name": format!("user{user_id}"),
            "title": title,
            "viewer_count": viewers,
        }))
        .unwrap()
    }

    /// Serves queued listings in order; the last one repeats.
    struct FakeSource {
        games: Vec<Game>,
        listings: Mutex<Vec<Vec<Stream>>>,
        game_lookups: AtomicUsize,
    }

    impl FakeSource {
        fn new(listings: Vec<Vec<Stream>>) -> Self {
            Self {
                games: vec![Game {
                    id: "1".into(),
                    name: "Diablo II: Lord of Destruction".into(),
                    box_art_url: None,
                }],
                listings: Mutex::new(listings),
                game_lookups: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ListingSource for FakeSource {
        async fn get_game(&self, name: &str) -> Result<Option<Game>, StreamwatchError> {
            self.game_lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .games
                .iter()
                .find(|g| g.name.eq_ignore_ascii_case(name))
                .cloned())
        }

        async fn get_streams(&self, _game_id: &str) -> Result<Vec<Stream>, StreamwatchError> {
            let mut listings = self.listings.lock().unwrap();
            if listings.len() > 1 {
                Ok(listings.remove(0))
            } else {
                Ok(listings.first().cloned().unwrap_or_default())
            }
        }
    }

    fn monitor(source: Arc<FakeSource>, limit: usize) -> StreamMonitor {
        StreamMonitor::new(source, "diablo ii: lord of destruction", "median ?(xl)?|mxl", limit)
            .unwrap()
    }

    #[tokio::test]
    async fn game_lookup_is_cached_case_insensitively() {
        let source = Arc::new(FakeSource::new(vec![vec![]]));
        let monitor = monitor(source.clone(), 5);

        monitor.refresh().await.unwrap();
        monitor.refresh().await.unwrap();

        assert_eq!(source.game_lookups.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.game_name(), "Diablo II: Lord of Destruction");
    }

    #[tokio::test]
    async fn went_offline_streams_filtered_and_prepended() {
        let source = Arc::new(FakeSource::new(vec![
            vec![
                stream("a", "Median XL ladder", 10),
                stream("b", "vanilla hell cows", 20),
                stream("c", "MXL trade", 5),
            ],
            vec![stream("c", "MXL trade", 5)],
            vec![],
        ]));
        let monitor = monitor(source, 5);

        monitor.refresh().await.unwrap();
        let outcome = monitor.refresh().await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Updated {
                live: 1,
                went_offline: 1
            }
        );
        let snap = monitor.snapshot();
        assert_eq!(snap.history.len(), 1);
        assert_eq!(snap.history[0].stream.user_id, "a");

        monitor.refresh().await.unwrap();
        let snap = monitor.snapshot();
        let ids: Vec<&str> = snap.history.iter().map(|h| h.stream.user_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert!(snap.history[0].ended_at >= snap.history[1].ended_at);
    }

    #[tokio::test]
    async fn history_is_truncated() {
        let source = Arc::new(FakeSource::new(vec![
            vec![
                stream("a", "mxl 1", 1),
                stream("b", "mxl 2", 1),
                stream("c", "mxl 3", 1),
            ],
            vec![],
        ]));
        let monitor = monitor(source, 2);
        monitor.refresh().await.unwrap();
        monitor.refresh().await.unwrap();
        assert_eq!(monitor.snapshot().history.len(), 2);
    }

    #[tokio::test]
    async fn change_game_reverts_on_not_found() {
        let source = Arc::new(FakeSource::new(vec![vec![]]));
        let monitor = monitor(source, 5);
        monitor.refresh().await.unwrap();

        let err = monitor.change_game("Unknown Game").await.unwrap_err();
        assert!(matches!(err, StreamwatchError::NotFound(ref n) if n == "Unknown Game"));
        assert_eq!(monitor.game_name(), "Diablo II: Lord of Destruction");
    }

    #[tokio::test]
    async fn change_game_resets_title_filter_only_on_success() {
        let source = Arc::new(FakeSource::new(vec![vec![]]));
        let monitor = monitor(source, 5);

        monitor.change_game("Unknown Game").await.unwrap_err();
        assert_eq!(monitor.title_filter(), "median ?(xl)?|mxl");

        monitor.change_game("DIABLO II: LORD OF DESTRUCTION").await.unwrap();
        assert_eq!(monitor.title_filter(), MATCH_ALL_FILTER);
        assert_eq!(monitor.game_name(), "Diablo II: Lord of Destruction");
    }

    #[tokio::test]
    async fn try_refresh_skips_while_cycle_runs() {
        let source = Arc::new(FakeSource::new(vec![vec![]]));
        let monitor = monitor(source, 5);
        let _held = monitor.cycle.lock().await;
        assert_eq!(monitor.try_refresh().await.unwrap(), RefreshOutcome::Skipped);
    }

    #[test]
    fn invalid_title_filter_keeps_previous() {
        let source = Arc::new(FakeSource::new(vec![vec![]]));
        let monitor = monitor(source, 5);
        let err = monitor.set_title_filter("(unclosed").unwrap_err();
        assert!(matches!(err, StreamwatchError::ValidationError(_)));
        assert_eq!(monitor.title_filter(), "median ?(xl)?|mxl");

        monitor.set_title_filter("ladder|trade").unwrap();
        assert_eq!(monitor.title_filter(), "ladder|trade");
    }

    #[test]
    fn visible_streams_sorted_and_limited() {
        let snap = MonitorSnapshot {
            game_name: "g".into(),
            game: None,
            title_filter: "mxl".into(),
            streams: vec![
                stream("a", "MXL low", 1),
                stream("b", "vanilla", 100),
                stream("c", "mxl high", 50),
                stream("d", "Mxl mid", 10),
            ],
            history: vec![],
            last_updated: None,
        };
        let ids: Vec<&str> = snap
            .visible_streams(2)
            .iter()
            .map(|s| s.user_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "d"]);
    }
}
