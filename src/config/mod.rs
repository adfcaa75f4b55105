pub mod env;
pub mod loader;
pub mod types;

pub use loader::{load_config, require_client_id};
pub use types::AppConfig;
