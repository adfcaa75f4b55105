use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::api::Stream;
use crate::error::StreamwatchError;
use crate::monitor::{MonitorSnapshot, OfflineStream};
use crate::schedule::{to_time_units, FormatOptions, TimeUnit};

/// Titles longer than this are cut and marked with `...`.
const MAX_TITLE_LEN: usize = 80;

/// Auto-update state shown in the listing header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoUpdateStatus {
    pub active: bool,
    pub interval_ms: u64,
}

fn coarse(ms: u64) -> String {
    to_time_units(
        ms,
        &FormatOptions::with_units(&[TimeUnit::Day, TimeUnit::Hour, TimeUnit::Minute]),
    )
}

fn since(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - start).num_milliseconds()).unwrap_or(0)
}

fn truncate_title(title: &str) -> String {
    let title = title.trim();
    if title.chars().count() > MAX_TITLE_LEN {
        let cut: String = title.chars().take(MAX_TITLE_LEN).collect();
        format!("{}...", cut.trim_end())
    } else {
        title.to_string()
    }
}

fn paint(text: String, is_tty: bool, style: fn(&str) -> colored::ColoredString) -> String {
    if is_tty {
        style(&text).to_string()
    } else {
        text
    }
}

fn stream_url(stream: &Stream) -> String {
    let login = if stream.user_login.is_empty() {
        &stream.user_name
    } else {
        &stream.user_login
    };
    format!("https://twitch.tv/{login}")
}

fn format_stream(stream: &Stream, now: DateTime<Utc>, is_tty: bool) -> String {
    let uptime = stream
        .started_at
        .map(|at| format!("{} uptime, ", coarse(since(at, now))))
        .unwrap_or_default();
    let stats = format!("({uptime}{} viewers)", stream.viewer_count);
    format!(
        "{} {}\n  {}",
        paint(stream_url(stream), is_tty, |s| s.underline()),
        paint(stats, is_tty, |s| s.dimmed()),
        truncate_title(&stream.title)
    )
}

/// Render the live listing with its status header.
pub fn format_listing(
    snapshot: &MonitorSnapshot,
    display_max: usize,
    auto_update: Option<AutoUpdateStatus>,
    now: DateTime<Utc>,
    is_tty: bool,
) -> String {
    let visible = snapshot.visible_streams(display_max);
    let mut header = Vec::new();

    if let Some(status) = auto_update {
        header.push(if status.active {
            format!("✓ AutoUpdate ({})", coarse(status.interval_ms))
        } else {
            "✗ AutoUpdate".to_string()
        });
    }
    header.push(paint(snapshot.game_name.clone(), is_tty, |s| s.bold()));
    header.push(format!(
        "Filter: {} (displaying {}/{})",
        snapshot.title_filter,
        visible.len(),
        snapshot.streams.len()
    ));
    if let Some(at) = snapshot.last_updated {
        header.push(format!("Last Update: {}", at.format("%Y-%m-%d %H:%M:%S UTC")));
    }

    let body: Vec<String> = visible
        .iter()
        .map(|s| format_stream(s, now, is_tty))
        .collect();

    if body.is_empty() {
        format!("{}\n\nNo matching streams", header.join("\n"))
    } else {
        format!("{}\n\n{}", header.join("\n"), body.join("\n\n"))
    }
}

/// Render the went-offline history, newest first.
pub fn format_history(history: &[OfflineStream], now: DateTime<Utc>) -> String {
    if history.is_empty() {
        return "No streams went offline yet".to_string();
    }
    history
        .iter()
        .map(|entry| {
            format!(
                "{} ended {} ago: {}",
                stream_url(&entry.stream),
                coarse(since(entry.ended_at, now)),
                truncate_title(&entry.stream.title)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_listing(
    snapshot: &MonitorSnapshot,
    display_max: usize,
    auto_update: Option<AutoUpdateStatus>,
    is_tty: bool,
) {
    println!(
        "{}",
        format_listing(snapshot, display_max, auto_update, Utc::now(), is_tty)
    );
}

pub fn print_snapshot_json(snapshot: &MonitorSnapshot) {
    println!("{}", serde_json::to_string_pretty(snapshot).unwrap_or_default());
}

pub fn print_error(err: &StreamwatchError, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&err.to_json()).unwrap_or_default());
    } else {
        eprintln!("{}", err);
    }
}
