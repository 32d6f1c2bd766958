//! Replays annotated series through the entry rule and labels every signal.

use crate::config::{Config, StrategyConfig};
use crate::error::ScanError;
use crate::indicators::volatility::compute_bands;
use crate::models::indicators::{validate_series, AnnotatedCandle, Candle};
use crate::models::signal::OutcomeRecord;
use crate::services::universe::{candidate_instruments, tradable_instruments};
use crate::services::venue::{connect_with_retry, VenueClient};
use crate::signals::{OutcomeEvaluator, SignalDetector};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ops::RangeInclusive;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct BacktestRunner {
    config: StrategyConfig,
    detector: SignalDetector,
    evaluator: OutcomeEvaluator,
}

impl BacktestRunner {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            detector: SignalDetector::from_config(&config),
            evaluator: OutcomeEvaluator::from_config(&config),
            config,
        }
    }

    /// Positions of a series of `len` candles that have a fully annotated
    /// lookback window and an in-bounds future candle.
    pub fn evaluable_range(&self, len: usize) -> Option<RangeInclusive<usize>> {
        let first = self.config.lookback + self.config.window.saturating_sub(1);
        let last = len.checked_sub(self.config.lookahead + 1)?;
        (first <= last).then_some(first..=last)
    }

    /// Fails when no position of a `len`-candle series can be labeled.
    pub fn ensure_evaluable(&self, len: usize) -> Result<(), ScanError> {
        match self.evaluable_range(len) {
            Some(_) => Ok(()),
            None => Err(ScanError::NoEvaluablePositions {
                required: self.config.min_evaluable_len(),
                actual: len,
            }),
        }
    }

    /// Label every signal of an annotated series, oldest first.
    pub fn run(&self, series: &[AnnotatedCandle], instrument: &str) -> Vec<OutcomeRecord> {
        let Some(range) = self.evaluable_range(series.len()) else {
            return Vec::new();
        };

        range
            .filter_map(|index| self.detector.detect(series, index, instrument))
            .filter_map(|signal| {
                let future = series.get(self.evaluator.future_index(&signal))?;
                Some(self.evaluator.evaluate(&signal, &future.candle))
            })
            .collect()
    }

    /// Validate and annotate raw candles, then run.
    pub fn run_candles(
        &self,
        candles: &[Candle],
        instrument: &str,
    ) -> Result<Vec<OutcomeRecord>, ScanError> {
        validate_series(candles).map_err(ScanError::DataIntegrity)?;
        let series = compute_bands(candles, self.config.window, self.config.num_std)?;
        Ok(self.run(&series, instrument))
    }
}

/// Instrument that produced no usable data, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedInstrument {
    pub instrument: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BacktestReport {
    pub records: Vec<OutcomeRecord>,
    pub skipped: Vec<SkippedInstrument>,
    pub instruments_run: usize,
}

impl BacktestReport {
    pub fn wins(&self) -> usize {
        self.records.iter().filter(|r| r.result.is_win()).count()
    }

    pub fn losses(&self) -> usize {
        self.records.len() - self.wins()
    }

    pub fn win_rate(&self) -> Option<f64> {
        if self.records.is_empty() {
            None
        } else {
            Some(self.wins() as f64 / self.records.len() as f64)
        }
    }
}

/// Backtest every tradable instrument of the universe at `as_of`.
///
/// A failed connection aborts the run; any per-instrument failure only
/// removes that instrument's contribution and is listed in
/// [`BacktestReport::skipped`].
pub async fn run_backtest(
    venue: &dyn VenueClient,
    config: &Config,
    as_of: DateTime<Utc>,
) -> Result<BacktestReport, ScanError> {
    let started = Instant::now();
    let message = connect_with_retry(venue).await?;
    info!(message = %message, "Backtest: connected");

    let report = backtest_universe(venue, config, as_of).await;

    if let Err(e) = venue.disconnect().await {
        warn!(error = %e, "Backtest: disconnect failed");
    }

    let report = report?;
    info!(
        instruments = report.instruments_run,
        records = report.records.len(),
        skipped = report.skipped.len(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Backtest: finished {} instruments in {:.2}s",
        report.instruments_run,
        started.elapsed().as_secs_f64()
    );
    Ok(report)
}

async fn backtest_universe(
    venue: &dyn VenueClient,
    config: &Config,
    as_of: DateTime<Utc>,
) -> Result<BacktestReport, ScanError> {
    let runner = BacktestRunner::new(config.strategy.clone());
    let candidates = candidate_instruments(venue, config.symbols.as_deref()).await?;
    let selection = tradable_instruments(venue, &candidates, &config.universe).await;

    info!(
        candidates = candidates.len(),
        tradable = selection.tradable.len(),
        failed = selection.failed.len(),
        "Backtest: {} of {} instruments tradable",
        selection.tradable.len(),
        candidates.len()
    );

    let mut report = BacktestReport::default();
    for (instrument, e) in selection.failed {
        report.skipped.push(SkippedInstrument {
            instrument,
            reason: ScanError::from(e).to_string(),
        });
    }

    for (instrument, status) in selection.tradable {
        let started = Instant::now();
        info!(instrument = %instrument, name = %status.display_name, "Backtest: processing {}", status.display_name);

        let outcome = match venue
            .fetch_candles(
                &instrument,
                as_of,
                config.feed.history_seconds,
                config.feed.interval_seconds,
            )
            .await
        {
            Ok(candles) => runner
                .run_candles(&candles, &instrument)
                .and_then(|records| runner.ensure_evaluable(candles.len()).map(|()| records)),
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(records) => {
                debug!(
                    instrument = %instrument,
                    records = records.len(),
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Backtest: {} done in {:.2}s",
                    instrument,
                    started.elapsed().as_secs_f64()
                );
                report.instruments_run += 1;
                report.records.extend(records);
            }
            Err(e) => {
                warn!(instrument = %instrument, kind = e.kind(), error = %e, "Backtest: skipping {}", instrument);
                report.skipped.push(SkippedInstrument {
                    instrument,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(report)
}
