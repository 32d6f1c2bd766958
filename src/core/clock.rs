//! Time source for the live scanner.
//!
//! Scheduling runs on a monotonic timeline measured from the clock's origin;
//! wall time is only read to stamp candle requests and to learn, once, where
//! in the candle interval the timeline starts.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;

#[async_trait::async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic time elapsed since the clock's origin.
    fn elapsed(&self) -> Duration;

    fn wall_time(&self) -> DateTime<Utc>;

    /// Suspend until `elapsed()` reaches `deadline`.
    async fn sleep_until(&self, deadline: Duration);
}

/// Tokio timer backed clock. Honors `tokio::time::pause`.
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Clock for TokioClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    fn wall_time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: Duration) {
        tokio::time::sleep_until(self.origin + deadline).await;
    }
}

/// Virtual clock: sleeping jumps straight to the deadline.
pub struct ManualClock {
    now: Mutex<Duration>,
    wall_origin: DateTime<Utc>,
}

impl ManualClock {
    pub fn new(wall_origin: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(Duration::ZERO),
            wall_origin,
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

#[async_trait::async_trait]
impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn wall_time(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.elapsed()).unwrap_or_default();
        self.wall_origin + elapsed
    }

    async fn sleep_until(&self, deadline: Duration) {
        {
            let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
            if deadline > *now {
                *now = deadline;
            }
        }
        tokio::task::yield_now().await;
    }
}

/// Position of the monotonic timeline within a repeating interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalPhase {
    interval: Duration,
    origin: Duration,
    offset: Duration,
}

impl IntervalPhase {
    /// At monotonic time `origin` the timeline sits `offset` into the interval.
    pub fn new(interval: Duration, origin: Duration, offset: Duration) -> Self {
        Self {
            interval,
            origin,
            offset: duration_rem(offset, interval),
        }
    }

    /// Anchor the phase once from the clock's wall time.
    pub fn from_clock(clock: &dyn Clock, interval: Duration) -> Self {
        let origin = clock.elapsed();
        let wall = clock.wall_time();
        let nanos = wall.timestamp() as i128 * 1_000_000_000 + wall.timestamp_subsec_nanos() as i128;
        let into = nanos.rem_euclid(interval.as_nanos().max(1) as i128);
        Self::new(interval, origin, Duration::from_nanos(into as u64))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How far into the interval the monotonic instant `at` falls.
    pub fn position(&self, at: Duration) -> Duration {
        duration_rem(self.offset + at.saturating_sub(self.origin), self.interval)
    }
}

fn duration_rem(value: Duration, interval: Duration) -> Duration {
    let interval = interval.as_nanos().max(1);
    Duration::from_nanos((value.as_nanos() % interval) as u64)
}
