//! Read-only dependencies shared by every scan worker

use crate::config::Config;
use crate::core::clock::{Clock, IntervalPhase};
use crate::metrics::Metrics;
use crate::services::venue::VenueClient;
use crate::signals::{OutcomeEvaluator, SignalDetector};
use std::sync::Arc;
use std::time::Duration;

/// The venue session is the only shared resource; everything else is
/// configuration.
pub struct JobContext {
    pub venue: Arc<dyn VenueClient>,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    /// Where the timeline sits within the candle interval, for trade expiry.
    pub phase: IntervalPhase,
    pub detector: SignalDetector,
    pub evaluator: OutcomeEvaluator,
    pub metrics: Option<Arc<Metrics>>,
}

impl JobContext {
    pub fn new(
        venue: Arc<dyn VenueClient>,
        config: Arc<Config>,
        clock: Arc<dyn Clock>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let phase = IntervalPhase::from_clock(
            clock.as_ref(),
            Duration::from_secs(config.feed.interval_seconds),
        );
        Self {
            detector: SignalDetector::from_config(&config.strategy),
            evaluator: OutcomeEvaluator::from_config(&config.strategy),
            venue,
            config,
            clock,
            phase,
            metrics,
        }
    }

    /// Duration of a trade placed now.
    pub fn trade_duration_seconds(&self) -> u64 {
        let position = self.phase.position(self.clock.elapsed());
        self.config
            .live
            .expiry
            .duration_seconds(position.as_secs_f64(), self.config.feed.interval_seconds)
    }
}
