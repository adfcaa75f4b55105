use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::StreamwatchError;
use crate::schedule::duration::from_time_units;

/// Future returned by a scheduler tick. Errors must be handled inside it.
pub type TickFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Callback invoked on every tick.
pub type TickCallback = Arc<dyn Fn() -> TickFuture + Send + Sync>;

/// Interval bounds plus the current value, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval_ms: u64,
    pub min_bound_ms: u64,
    pub max_bound_ms: u64,
}

impl SchedulerConfig {
    pub fn check(&self, value_ms: u64) -> Result<u64, StreamwatchError> {
        if value_ms < self.min_bound_ms || value_ms > self.max_bound_ms {
            return Err(StreamwatchError::RangeError {
                value_ms,
                min_ms: self.min_bound_ms,
                max_ms: self.max_bound_ms,
            });
        }
        Ok(value_ms)
    }
}

/// A requested interval, either raw milliseconds or a duration string
/// such as `"10m"` or `"1h 30m"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalValue {
    Millis(u64),
    Text(String),
}

impl IntervalValue {
    pub fn to_millis(&self) -> Result<u64, StreamwatchError> {
        match self {
            IntervalValue::Millis(ms) => Ok(*ms),
            IntervalValue::Text(text) => from_time_units(text),
        }
    }
}

impl From<u64> for IntervalValue {
    fn from(ms: u64) -> Self {
        IntervalValue::Millis(ms)
    }
}

impl From<&str> for IntervalValue {
    fn from(text: &str) -> Self {
        IntervalValue::Text(text.to_string())
    }
}

impl From<String> for IntervalValue {
    fn from(text: String) -> Self {
        IntervalValue::Text(text)
    }
}

/// Restartable repeating timer.
///
/// Stopped until [`start`](Self::start) is called. Each tick spawns the
/// callback as its own task, so stopping the timer never interrupts a tick
/// that is already running. The first tick fires one full interval after
/// the timer starts. Must be used from within a tokio runtime.
pub struct DynamicIntervalScheduler {
    callback: TickCallback,
    config: SchedulerConfig,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for DynamicIntervalScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicIntervalScheduler")
            .field("config", &self.config)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl DynamicIntervalScheduler {
    /// Create a stopped scheduler. The initial interval must lie within the bounds.
    pub fn new(callback: TickCallback, config: SchedulerConfig) -> Result<Self, StreamwatchError> {
        if config.min_bound_ms == 0 || config.min_bound_ms > config.max_bound_ms {
            return Err(StreamwatchError::ValidationError(format!(
                "invalid interval bounds {}ms..={}ms",
                config.min_bound_ms, config.max_bound_ms
            )));
        }
        config.check(config.interval_ms)?;
        Ok(Self {
            callback,
            config,
            handle: None,
        })
    }

    /// Begin ticking. No-op when already running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        let period = Duration::from_millis(self.config.interval_ms);
        let first_tick = Instant::now() + period;
        let callback = Arc::clone(&self.callback);
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tokio::spawn(callback());
            }
        }));
        tracing::debug!("Scheduler started ({}ms)", self.config.interval_ms);
    }

    /// Cancel the pending timer. No-op when already stopped.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Scheduler stopped");
        }
    }

    /// Stop and start again so the current interval takes effect.
    pub fn restart(&mut self) {
        self.stop();
        self.start();
    }

    /// Validate a new interval and store it without touching the run state.
    ///
    /// On error nothing changes. A running timer keeps its old period until
    /// [`restart`](Self::restart) is called.
    pub fn validate_and_store(
        &mut self,
        value: impl Into<IntervalValue>,
    ) -> Result<u64, StreamwatchError> {
        let ms = self.config.check(value.into().to_millis()?)?;
        self.config.interval_ms = ms;
        Ok(ms)
    }

    /// Validate and store a new interval, then restart the timer.
    ///
    /// A stopped scheduler is left running afterwards.
    pub fn set_interval(&mut self, value: impl Into<IntervalValue>) -> Result<u64, StreamwatchError> {
        let ms = self.validate_and_store(value)?;
        self.restart();
        tracing::info!("Update interval set to {ms}ms");
        Ok(ms)
    }

    pub fn interval_ms(&self) -> u64 {
        self.config.interval_ms
    }

    pub fn min_interval_ms(&self) -> u64 {
        self.config.min_bound_ms
    }

    pub fn max_interval_ms(&self) -> u64 {
        self.config.max_bound_ms
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for DynamicIntervalScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MINUTE: u64 = 60_000;

    fn config(interval_ms: u64) -> SchedulerConfig {
        SchedulerConfig {
            interval_ms,
            min_bound_ms: MINUTE,
            max_bound_ms: 60 * MINUTE,
        }
    }

    fn counting_callback() -> (TickCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let callback: TickCallback = Arc::new(move || -> TickFuture {
            let count = Arc::clone(&inner);
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
            })
        });
        (callback, count)
    }

    fn noop_callback() -> TickCallback {
        Arc::new(|| -> TickFuture { Box::pin(async {}) })
    }

    /// Let spawned tasks run after the clock moved.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn new_rejects_out_of_range_interval() {
        let err = DynamicIntervalScheduler::new(noop_callback(), config(1_000)).unwrap_err();
        assert!(matches!(err, StreamwatchError::RangeError { .. }));
    }

    #[test]
    fn new_rejects_inverted_bounds() {
        let cfg = SchedulerConfig {
            interval_ms: MINUTE,
            min_bound_ms: 2 * MINUTE,
            max_bound_ms: MINUTE,
        };
        assert!(DynamicIntervalScheduler::new(noop_callback(), cfg).is_err());
    }

    #[tokio::test]
    async fn starts_stopped() {
        let scheduler = DynamicIntervalScheduler::new(noop_callback(), config(MINUTE)).unwrap();
        assert!(!scheduler.is_active());
        assert_eq!(scheduler.interval_ms(), MINUTE);
        assert_eq!(scheduler.min_interval_ms(), MINUTE);
        assert_eq!(scheduler.max_interval_ms(), 60 * MINUTE);
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let mut scheduler = DynamicIntervalScheduler::new(noop_callback(), config(MINUTE)).unwrap();
        scheduler.start();
        scheduler.start();
        assert!(scheduler.is_active());
        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_active());
    }

    #[tokio::test]
    async fn set_interval_accepts_values_within_bounds() {
        let mut scheduler = DynamicIntervalScheduler::new(noop_callback(), config(MINUTE)).unwrap();
        for value in [MINUTE, 5 * MINUTE, 60 * MINUTE] {
            assert_eq!(scheduler.set_interval(value).unwrap(), value);
            assert_eq!(scheduler.interval_ms(), value);
            assert!(scheduler.is_active());
        }
    }

    #[tokio::test]
    async fn set_interval_parses_duration_text() {
        let mut scheduler = DynamicIntervalScheduler::new(noop_callback(), config(MINUTE)).unwrap();
        assert_eq!(scheduler.set_interval("1h").unwrap(), 60 * MINUTE);
        assert_eq!(scheduler.set_interval("2m 30s").unwrap(), 150_000);
    }

    #[tokio::test]
    async fn set_interval_out_of_range_changes_nothing() {
        let mut scheduler = DynamicIntervalScheduler::new(noop_callback(), config(MINUTE)).unwrap();
        for value in [0, MINUTE - 1, 60 * MINUTE + 1] {
            let err = scheduler.set_interval(value).unwrap_err();
            assert!(matches!(err, StreamwatchError::RangeError { .. }));
            assert_eq!(scheduler.interval_ms(), MINUTE);
            assert!(!scheduler.is_active());
        }
    }

    #[tokio::test]
    async fn set_interval_with_malformed_text_is_validation_error() {
        let mut scheduler = DynamicIntervalScheduler::new(noop_callback(), config(MINUTE)).unwrap();
        scheduler.start();
        let err = scheduler.set_interval("ten minutes").unwrap_err();
        assert!(matches!(err, StreamwatchError::ValidationError(_)));
        assert_eq!(scheduler.interval_ms(), MINUTE);
        assert!(scheduler.is_active());
    }

    #[tokio::test]
    async fn set_interval_while_stopped_starts_running() {
        let mut scheduler = DynamicIntervalScheduler::new(noop_callback(), config(MINUTE)).unwrap();
        scheduler.set_interval(2 * MINUTE).unwrap();
        assert!(scheduler.is_active());
    }

    #[tokio::test]
    async fn validate_and_store_keeps_run_state() {
        let mut scheduler = DynamicIntervalScheduler::new(noop_callback(), config(MINUTE)).unwrap();
        assert_eq!(scheduler.validate_and_store("3m").unwrap(), 3 * MINUTE);
        assert_eq!(scheduler.interval_ms(), 3 * MINUTE);
        assert!(!scheduler.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn fires_every_interval() {
        let (callback, count) = counting_callback();
        let mut scheduler = DynamicIntervalScheduler::new(callback, config(MINUTE)).unwrap();
        scheduler.start();
        settle().await;

        tokio::time::advance(Duration::from_millis(MINUTE - 1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(MINUTE)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_ticks() {
        let (callback, count) = counting_callback();
        let mut scheduler = DynamicIntervalScheduler::new(callback, config(MINUTE)).unwrap();
        scheduler.start();
        settle().await;
        scheduler.stop();

        tokio::time::advance(Duration::from_millis(5 * MINUTE)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn new_interval_applies_after_restart() {
        let (callback, count) = counting_callback();
        let mut scheduler = DynamicIntervalScheduler::new(callback, config(MINUTE)).unwrap();
        scheduler.start();
        settle().await;
        scheduler.set_interval(10 * MINUTE).unwrap();
        settle().await;

        tokio::time::advance(Duration::from_millis(5 * MINUTE)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(5 * MINUTE)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
