pub mod manager;
pub mod token;

pub use manager::{RefreshCallback, TokenLifecycleManager, DEFAULT_TOKEN_URL};
pub use token::{Credentials, TokenResponse, TokenStore, TokenUpdate};
