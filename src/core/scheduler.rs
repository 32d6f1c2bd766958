//! Tick scheduler gating how often the universe is scanned.

use crate::core::clock::{Clock, IntervalPhase};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanCadence {
    /// One tick per interval, `lead` before each interval boundary.
    IntervalWindow { interval: Duration, lead: Duration },
    /// A tick every `min_delay`; each instrument also waits at least
    /// `min_delay` between its own scans.
    Continuous { min_delay: Duration },
}

impl Default for ScanCadence {
    fn default() -> Self {
        ScanCadence::IntervalWindow {
            interval: Duration::from_secs(60),
            lead: Duration::from_secs(10),
        }
    }
}

impl ScanCadence {
    /// Rest an instrument observes after a successful scan before it is
    /// eligible again.
    pub fn rest_after_scan(&self) -> Duration {
        match self {
            ScanCadence::IntervalWindow { .. } => Duration::ZERO,
            ScanCadence::Continuous { min_delay } => *min_delay,
        }
    }
}

/// Produces scan ticks on the clock's monotonic timeline.
pub struct ScanScheduler {
    cadence: ScanCadence,
    clock: Arc<dyn Clock>,
    phase: Option<IntervalPhase>,
    last_tick: Option<Duration>,
}

impl ScanScheduler {
    pub fn new(cadence: ScanCadence, clock: Arc<dyn Clock>) -> Self {
        let phase = match cadence {
            ScanCadence::IntervalWindow { interval, .. } => {
                Some(IntervalPhase::from_clock(clock.as_ref(), interval))
            }
            ScanCadence::Continuous { .. } => None,
        };
        Self::with_phase(cadence, clock, phase)
    }

    /// Use an explicit interval phase instead of reading the wall clock.
    pub fn with_phase(
        cadence: ScanCadence,
        clock: Arc<dyn Clock>,
        phase: Option<IntervalPhase>,
    ) -> Self {
        info!(cadence = ?cadence, "ScanScheduler: created with cadence {:?}", cadence);
        Self {
            cadence,
            clock,
            phase,
            last_tick: None,
        }
    }

    pub fn cadence(&self) -> ScanCadence {
        self.cadence
    }

    /// The next tick at or after `now`, never repeating the previous one.
    pub fn next_deadline(&self, now: Duration) -> Duration {
        match self.cadence {
            ScanCadence::IntervalWindow { interval, lead } => {
                let target = interval.saturating_sub(lead);
                let position = self
                    .phase
                    .map(|p| p.position(now))
                    .unwrap_or(Duration::ZERO);
                let wait = if position <= target {
                    target - position
                } else {
                    interval - position + target
                };
                let deadline = now + wait;
                match self.last_tick {
                    Some(last) if deadline <= last => deadline + interval,
                    _ => deadline,
                }
            }
            ScanCadence::Continuous { min_delay } => match self.last_tick {
                Some(last) => (last + min_delay).max(now),
                None => now,
            },
        }
    }

    /// Sleep until the next tick and return its monotonic time.
    pub async fn wait_for_tick(&mut self) -> Duration {
        let deadline = self.next_deadline(self.clock.elapsed());
        self.clock.sleep_until(deadline).await;
        self.last_tick = Some(deadline);
        debug!(tick = ?deadline, "ScanScheduler: tick");
        deadline
    }
}
