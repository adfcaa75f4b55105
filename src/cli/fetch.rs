use std::io::IsTerminal;

use crate::error::StreamwatchError;

use super::output::{print_listing, print_snapshot_json};
use super::session::Session;

/// Run a single fetch cycle and print the result.
pub async fn run_fetch(
    config_path: Option<&str>,
    json: bool,
    game: Option<&str>,
) -> Result<(), StreamwatchError> {
    let session = Session::open(config_path)?;
    match game {
        Some(name) => session.monitor.change_game(name).await?,
        None => session.monitor.refresh().await?,
    };

    let snapshot = session.monitor.snapshot();
    if json {
        print_snapshot_json(&snapshot);
    } else {
        let display_max = session.settings.snapshot().display_max;
        print_listing(&snapshot, display_max, None, std::io::stdout().is_terminal());
    }

    if game.is_some() {
        session.persist()?;
    }
    Ok(())
}
