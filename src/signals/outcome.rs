//! Win/loss labeling of signals, retrospective and live.

use crate::config::StrategyConfig;
use crate::error::ScanError;
use crate::models::indicators::Candle;
use crate::models::signal::{Direction, LiveOutcome, OutcomeRecord, Signal, TradeResult};
use crate::services::venue::{TradeHandle, VenueClient, VenueError};
use tracing::{info, warn};

/// Expiry step used when aligning trades to the end of the interval.
const EXPIRY_STEP_SECONDS: f64 = 5.0;

/// How long a live trade runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeExpiry {
    Fixed(u64),
    /// Expire at the end of the current candle interval, rounded to 5 s.
    AlignToInterval,
}

impl TradeExpiry {
    /// Trade duration given how far into the current interval the scan is.
    pub fn duration_seconds(&self, seconds_into_interval: f64, interval_seconds: u64) -> u64 {
        match self {
            TradeExpiry::Fixed(seconds) => *seconds,
            TradeExpiry::AlignToInterval => {
                let remaining = (interval_seconds as f64 - seconds_into_interval).max(0.0);
                let steps = (remaining / EXPIRY_STEP_SECONDS).round_ties_even();
                ((steps * EXPIRY_STEP_SECONDS) as u64).max(EXPIRY_STEP_SECONDS as u64)
            }
        }
    }
}

/// Classify a close relative to the entry price for the signal's side.
pub fn classify(direction: Direction, entry_price: f64, close: f64) -> TradeResult {
    match direction {
        Direction::Buy => TradeResult::from_win(close > entry_price),
        Direction::Sell => TradeResult::from_win(close < entry_price),
    }
}

/// Trade accepted by the venue and not yet settled.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTrade {
    pub signal: Signal,
    pub handle: TradeHandle,
    pub amount: f64,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeEvaluator {
    lookahead: usize,
}

impl OutcomeEvaluator {
    pub fn new(lookahead: usize) -> Self {
        Self { lookahead }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.lookahead)
    }

    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    /// Index of the candle a signal is judged against.
    pub fn future_index(&self, signal: &Signal) -> usize {
        signal.index + self.lookahead
    }

    /// Label `signal` against the candle `lookahead` intervals after it.
    pub fn evaluate(&self, signal: &Signal, future: &Candle) -> OutcomeRecord {
        OutcomeRecord {
            timestamp: signal.timestamp,
            instrument: signal.instrument.clone(),
            direction: signal.direction,
            entry_price: signal.trigger_price,
            trigger_tick_volume: signal.tick_volume,
            reference_tick_volume: signal.reference_tick_volume,
            result: classify(signal.direction, signal.trigger_price, future.close),
        }
    }

    /// Re-check availability and place a timed trade for `signal`.
    pub async fn place(
        &self,
        venue: &dyn VenueClient,
        signal: &Signal,
        amount: f64,
        duration_seconds: u64,
    ) -> Result<PendingTrade, ScanError> {
        let status = venue.instrument_status(&signal.instrument).await?;
        if !status.is_open {
            return Err(VenueError::InstrumentClosed(signal.instrument.clone()).into());
        }

        info!(
            instrument = %signal.instrument,
            direction = %signal.direction,
            side = signal.direction.as_venue_side(),
            amount = amount,
            duration = duration_seconds,
            "OutcomeEvaluator: placing {} trade on {} for {}s",
            signal.direction,
            status.display_name,
            duration_seconds
        );

        let handle = venue
            .place_trade(amount, &signal.instrument, signal.direction, duration_seconds)
            .await?;

        Ok(PendingTrade {
            signal: signal.clone(),
            handle,
            amount,
            duration_seconds,
        })
    }

    /// Block until the venue settles `trade`, then log the balance.
    pub async fn settle(
        &self,
        venue: &dyn VenueClient,
        trade: PendingTrade,
    ) -> Result<LiveOutcome, ScanError> {
        let win = venue.await_settlement(&trade.handle.trade_id).await?;
        let result = TradeResult::from_win(win);

        info!(
            instrument = %trade.signal.instrument,
            direction = %trade.signal.direction,
            trade_id = %trade.handle.trade_id,
            result = %result,
            "OutcomeEvaluator: trade {} on {} settled: {}",
            trade.handle.trade_id,
            trade.signal.instrument,
            result
        );

        match venue.account_balance().await {
            Ok(balance) => info!(balance = balance, "OutcomeEvaluator: current balance {:.2}", balance),
            Err(e) => warn!(error = %e, "OutcomeEvaluator: failed to read balance"),
        }

        Ok(LiveOutcome {
            instrument: trade.signal.instrument,
            direction: trade.signal.direction,
            trigger_price: trade.signal.trigger_price,
            trade_id: trade.handle.trade_id,
            amount: trade.amount,
            duration_seconds: trade.duration_seconds,
            result,
        })
    }

    /// Place and settle in one step.
    pub async fn evaluate_live(
        &self,
        venue: &dyn VenueClient,
        signal: &Signal,
        amount: f64,
        duration_seconds: u64,
    ) -> Result<LiveOutcome, ScanError> {
        let trade = self.place(venue, signal, amount, duration_seconds).await?;
        self.settle(venue, trade).await
    }
}

impl Default for OutcomeEvaluator {
    fn default() -> Self {
        Self::from_config(&StrategyConfig::default())
    }
}
