//! Fixed-interval ticker for lanchat's periodic work.
//!
//! The chat page refreshes its peer list once per second. The [`Ticker`]
//! provides that cadence with overrun handling and pause/resume, so the
//! refresh only runs while the chat page is actually showing.
//!
//! # Disabled mode
//!
//! When `interval` is `None`, [`Ticker::wait_for_tick`] pends forever.
//! The same happens while the ticker is paused. Neither case spins: the
//! future simply never resolves, and the surrounding `select!` keeps
//! servicing its other branches.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(line) = inputs.recv() => { /* publish */ }
//!         _ = ticker.wait_for_tick() => { /* refresh peers */ }
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick is serviced late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one from now.
    #[default]
    Skip,
    /// Keep the original cadence. Missed deadlines fire back to back.
    Burst,
}

/// Configuration for a [`Ticker`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. `None` disables the ticker.
    pub interval: Option<Duration>,
    /// Overrun handling policy.
    pub policy: TickPolicy,
    /// Random jitter (0..max) added to the first tick only.
    pub initial_jitter: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: Some(Self::PEER_REFRESH_INTERVAL),
            policy: TickPolicy::default(),
            initial_jitter: Duration::ZERO,
        }
    }
}

impl TickConfig {
    /// Cadence of the chat page's peer-list refresh.
    pub const PEER_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

    /// Shortest accepted interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    /// A config ticking every `interval`.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            ..Default::default()
        }
    }

    /// A config that never ticks.
    pub fn disabled() -> Self {
        Self {
            interval: None,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called by [`Ticker::new`]. A zero interval would make every wait
    /// resolve immediately, so intervals are raised to
    /// [`Self::MIN_INTERVAL`].
    pub fn validated(mut self) -> Self {
        if let Some(interval) = self.interval {
            if interval < Self::MIN_INTERVAL {
                warn!(
                    interval_ms = interval.as_secs_f64() * 1000.0,
                    min_ms = Self::MIN_INTERVAL.as_secs_f64() * 1000.0,
                    "tick interval below minimum, clamping"
                );
                self.interval = Some(Self::MIN_INTERVAL);
            }
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about one tick, returned by [`Ticker::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct Tick {
    /// Monotonically increasing tick number, starting at 1.
    pub tick: u64,
    /// `true` if this tick was serviced noticeably late.
    pub overrun: bool,
    /// Ticks dropped because of the overrun (always 0 under `Burst`).
    pub ticks_skipped: u64,
}

/// Counters kept by the ticker.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Ticks fired.
    pub total_ticks: u64,
    /// Ticks that fired late.
    pub total_overruns: u64,
    /// Ticks dropped under `Skip`.
    pub total_skipped: u64,
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Fixed-interval ticker with pause/resume.
pub struct Ticker {
    config: TickConfig,
    tick_count: u64,
    next_tick: Option<Instant>,
    paused: bool,
    metrics: TickMetrics,
}

impl Ticker {
    /// Creates a ticker. The first tick is due one interval from now
    /// (plus jitter, if configured).
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        let next_tick = config.interval.map(|interval| {
            // Sub-microsecond jitter rounds down to no jitter at all.
            let max = config.initial_jitter.as_micros() as u64;
            let jitter = if max > 0 {
                Duration::from_micros(rand::rng().random_range(0..max))
            } else {
                Duration::ZERO
            };
            Instant::now() + interval + jitter
        });

        match config.interval {
            None => debug!("ticker created in disabled mode"),
            Some(interval) => debug!(
                interval_ms = interval.as_secs_f64() * 1000.0,
                policy = ?config.policy,
                "ticker created"
            ),
        }

        Self {
            config,
            tick_count: 0,
            next_tick,
            paused: false,
            metrics: TickMetrics::default(),
        }
    }

    /// A ticker firing every `interval` with default settings.
    pub fn every(interval: Duration) -> Self {
        Self::new(TickConfig::every(interval))
    }

    /// Waits until the next tick is due.
    ///
    /// Pends forever while paused or disabled. Cancel-safe: dropping the
    /// future before it resolves loses no tick.
    pub async fn wait_for_tick(&mut self) -> Tick {
        let (next, interval) = match (self.next_tick, self.config.interval) {
            (Some(next), Some(interval)) if !self.paused => (next, interval),
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > interval / 10;
        let mut ticks_skipped = 0u64;

        self.next_tick = Some(match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped =
                        (late_by.as_nanos() / interval.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "tick overrun, skipping ahead"
                        );
                    }
                }
                now + interval
            }
            TickPolicy::Burst => next + interval,
        });

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "tick fired");

        Tick {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "ticker paused");
        }
    }

    /// Resumes after a pause. The next tick is due one full interval
    /// from now, so time spent paused never produces a burst.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if let Some(interval) = self.config.interval {
                self.next_tick = Some(Instant::now() + interval);
            }
            debug!(tick = self.tick_count, "ticker resumed");
        }
    }

    /// Whether the ticker is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the ticker was configured without an interval.
    pub fn is_disabled(&self) -> bool {
        self.config.interval.is_none()
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The configured interval, or `None` when disabled.
    pub fn interval(&self) -> Option<Duration> {
        self.config.interval
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
