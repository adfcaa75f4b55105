pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod monitor;
pub mod schedule;
pub mod settings;

pub use api::{CollectionQuery, Game, HelixClient, ListingSource, PaginatedCollector, Stream};
pub use auth::{Credentials, TokenLifecycleManager, TokenStore, TokenUpdate};
pub use config::{load_config, AppConfig};
pub use error::StreamwatchError;
pub use monitor::{MonitorSnapshot, OfflineStream, RefreshOutcome, StreamMonitor};
pub use schedule::{from_time_units, to_time_units, DynamicIntervalScheduler, FormatOptions};
pub use settings::{Settings, SettingsStore};
