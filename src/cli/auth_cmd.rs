use crate::error::StreamwatchError;

use super::session::Session;

/// Force a token refresh. The new token is saved through the settings sink.
pub async fn run_auth(config_path: Option<&str>) -> Result<(), StreamwatchError> {
    let session = Session::open(config_path)?;
    session.auth.refresh().await?;
    let current = session.auth.current().await;
    println!("Access token refreshed for client '{}'", session.auth.client_id());
    println!("Usable until: {}", current.expires_at().format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Saved to {}", session.settings.path().display());
    Ok(())
}
