//! Band-touch reversal entry rule.

use crate::config::{StrategyConfig, REFERENCE_VOLUME_CANDLES};
use crate::models::indicators::{AnnotatedCandle, BandValues, Candle};
use crate::models::signal::{Direction, Signal};

/// Detects buy/sell entries on a candle that pierces a band, closes back
/// inside it with a body pointing away from the band, and trades on more
/// ticks than the reference candles before it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalDetector {
    lookback: usize,
    entry_offset: f64,
}

impl SignalDetector {
    pub fn new(lookback: usize, entry_offset: f64) -> Self {
        Self {
            lookback,
            entry_offset,
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.lookback, config.entry_offset)
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Evaluate the rule at `index`. Returns `None` when the position has no
    /// full lookback window, no bands yet, or the rule does not match.
    pub fn detect(
        &self,
        series: &[AnnotatedCandle],
        index: usize,
        instrument: &str,
    ) -> Option<Signal> {
        if index < self.lookback || index >= series.len() {
            return None;
        }
        let current = &series[index];
        let bands = current.bands?;
        let reference = reference_tick_volume(&series[index - self.lookback..index])?;
        let c = &current.candle;

        let (direction, trigger_price) = if is_buy(c, &bands, reference) {
            (Direction::Buy, c.low - self.entry_offset)
        } else if is_sell(c, &bands, reference) {
            (Direction::Sell, c.high + self.entry_offset)
        } else {
            return None;
        };

        Some(Signal {
            index,
            instrument: instrument.to_string(),
            direction,
            trigger_price,
            timestamp: c.timestamp,
            tick_volume: c.tick_volume,
            reference_tick_volume: reference,
        })
    }
}

impl Default for SignalDetector {
    fn default() -> Self {
        Self::from_config(&StrategyConfig::default())
    }
}

/// Mean tick volume of the oldest three candles of the lookback window.
fn reference_tick_volume(window: &[AnnotatedCandle]) -> Option<f64> {
    if window.len() < REFERENCE_VOLUME_CANDLES {
        return None;
    }
    let total: u64 = window[..REFERENCE_VOLUME_CANDLES]
        .iter()
        .map(|a| a.candle.tick_volume)
        .sum();
    Some(total as f64 / REFERENCE_VOLUME_CANDLES as f64)
}

fn is_buy(c: &Candle, bands: &BandValues, reference: f64) -> bool {
    c.low <= bands.lower
        && c.is_bullish()
        && c.close > bands.lower
        && c.tick_volume as f64 > reference
}

fn is_sell(c: &Candle, bands: &BandValues, reference: f64) -> bool {
    c.high >= bands.upper
        && c.is_bearish()
        && c.close < bands.upper
        && c.tick_volume as f64 > reference
}
