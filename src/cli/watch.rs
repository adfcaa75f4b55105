use std::io::IsTerminal;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::StreamwatchError;
use crate::monitor::{RefreshOutcome, StreamMonitor};
use crate::schedule::{
    from_time_units, to_time_units, DynamicIntervalScheduler, FormatOptions, TickCallback,
    TickFuture, TimeUnit,
};

use super::console::{parse_command, ConsoleCommand, HELP};
use super::output::{format_history, print_error, print_listing, AutoUpdateStatus};
use super::session::Session;

/// Interval used when the saved one cannot be parsed.
const FALLBACK_INTERVAL_MS: u64 = 600_000;

/// Display state shared between the console loop and scheduler ticks.
#[derive(Debug)]
struct Display {
    is_tty: bool,
    display_max: AtomicUsize,
    interval_ms: AtomicU64,
}

impl Display {
    fn print(&self, monitor: &StreamMonitor, active: bool) {
        let status = AutoUpdateStatus {
            active,
            interval_ms: self.interval_ms.load(Ordering::Relaxed),
        };
        print_listing(
            &monitor.snapshot(),
            self.display_max.load(Ordering::Relaxed),
            Some(status),
            self.is_tty,
        );
    }
}

fn initial_interval(text: &str, min_ms: u64, max_ms: u64) -> u64 {
    let ms = from_time_units(text).unwrap_or_else(|e| {
        tracing::warn!("Saved update interval '{text}' is invalid ({e}), using 10m");
        FALLBACK_INTERVAL_MS
    });
    ms.clamp(min_ms, max_ms)
}

fn tick_callback(monitor: Arc<StreamMonitor>, display: Arc<Display>) -> TickCallback {
    Arc::new(move || -> TickFuture {
        let monitor = Arc::clone(&monitor);
        let display = Arc::clone(&display);
        Box::pin(async move {
            match monitor.try_refresh().await {
                Ok(RefreshOutcome::Updated { .. }) => display.print(&monitor, true),
                Ok(RefreshOutcome::Skipped) => {}
                Err(e) => tracing::error!("Scheduled update failed: {e}"),
            }
        })
    })
}

/// Outcome of one console read.
#[derive(Debug, PartialEq, Eq)]
enum StdinEvent {
    Line(String),
    Skip,
    Closed,
}

/// Undecodable input drops the line. EOF or any other read error stops
/// console input while the watch keeps running.
fn classify_read(read: std::io::Result<Option<String>>) -> StdinEvent {
    match read {
        Ok(Some(line)) => StdinEvent::Line(line),
        Ok(None) => {
            tracing::debug!("stdin closed, waiting for Ctrl-C");
            StdinEvent::Closed
        }
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            tracing::warn!("Ignoring unreadable console input: {e}");
            StdinEvent::Skip
        }
        Err(e) => {
            tracing::warn!("Console input failed, waiting for Ctrl-C: {e}");
            StdinEvent::Closed
        }
    }
}

/// Start a stopped scheduler, refreshing first so the listing is current
/// without waiting a full interval. Returns whether a refresh completed.
async fn enable_auto_update(
    monitor: &StreamMonitor,
    scheduler: &mut DynamicIntervalScheduler,
) -> bool {
    if scheduler.is_active() {
        return false;
    }
    let refreshed = match monitor.refresh().await {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("Update failed: {e}");
            false
        }
    };
    scheduler.start();
    refreshed
}

/// Long-running mode: refresh on a timer and accept console commands.
pub async fn run_watch(config_path: Option<&str>) -> Result<(), StreamwatchError> {
    let session = Session::open(config_path)?;
    let saved = session.settings.snapshot();

    let interval_ms = initial_interval(
        &saved.update_interval,
        session.config.min_interval_ms,
        session.config.max_interval_ms,
    );
    let display = Arc::new(Display {
        is_tty: std::io::stdout().is_terminal(),
        display_max: AtomicUsize::new(saved.display_max),
        interval_ms: AtomicU64::new(interval_ms),
    });

    let mut scheduler = DynamicIntervalScheduler::new(
        tick_callback(Arc::clone(&session.monitor), Arc::clone(&display)),
        session.config.scheduler_config(interval_ms),
    )?;

    match session.monitor.refresh().await {
        Ok(_) => display.print(&session.monitor, saved.auto_update),
        Err(e) => tracing::error!("Initial update failed: {e}"),
    }
    if saved.auto_update {
        scheduler.start();
    }
    tracing::info!("Watching '{}', type 'help' for commands", session.monitor.game_name());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            read = lines.next_line(), if stdin_open => match classify_read(read) {
                StdinEvent::Line(line) => match parse_command(&line) {
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(e) = handle(command, &session, &mut scheduler, &display).await {
                            print_error(&e, false);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => print_error(&e, false),
                },
                StdinEvent::Skip => {}
                StdinEvent::Closed => stdin_open = false,
            },
        }
    }

    scheduler.stop();
    session.persist()
}

async fn handle(
    command: ConsoleCommand,
    session: &Session,
    scheduler: &mut DynamicIntervalScheduler,
    display: &Display,
) -> Result<(), StreamwatchError> {
    let monitor = &session.monitor;
    match command {
        ConsoleCommand::Refresh => {
            monitor.refresh().await?;
            display.print(monitor, scheduler.is_active());
        }
        ConsoleCommand::Show => display.print(monitor, scheduler.is_active()),
        ConsoleCommand::History => {
            println!("{}", format_history(&monitor.snapshot().history, chrono::Utc::now()));
        }
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Game(name) => {
            monitor.change_game(&name).await?;
            session.persist()?;
            display.print(monitor, scheduler.is_active());
        }
        ConsoleCommand::Filter(pattern) => {
            monitor.set_title_filter(&pattern)?;
            session.persist()?;
            display.print(monitor, scheduler.is_active());
        }
        ConsoleCommand::Interval(text) => {
            let ms = if scheduler.is_active() {
                scheduler.set_interval(text)?
            } else {
                scheduler.validate_and_store(text)?
            };
            display.interval_ms.store(ms, Ordering::Relaxed);
            let normalized = to_time_units(ms, &FormatOptions::with_units(&TimeUnit::ALL));
            session.settings.update(|s| s.update_interval = normalized.clone());
            session.settings.save()?;
            println!("Update interval set to {normalized}");
        }
        ConsoleCommand::ListSize(size) => {
            let max = session.config.history_limit;
            if size > max {
                return Err(StreamwatchError::ValidationError(format!(
                    "list size must be between 0 and {max}"
                )));
            }
            display.display_max.store(size, Ordering::Relaxed);
            session.settings.update(|s| s.display_max = size);
            session.settings.save()?;
            display.print(monitor, scheduler.is_active());
        }
        ConsoleCommand::AutoUpdate(on) => {
            if on {
                if enable_auto_update(monitor, scheduler).await {
                    display.print(monitor, true);
                }
            } else {
                scheduler.stop();
            }
            session.settings.update(|s| s.auto_update = on);
            session.settings.save()?;
            println!("Auto update {}", if on { "on" } else { "off" });
        }
        ConsoleCommand::Quit => {}
    }
    Ok(())
}
