use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fixed-interval OHLC observation with its tick count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Number of price ticks observed within the interval.
    pub tick_volume: u64,
}

impl Candle {
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        tick_volume: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            tick_volume,
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Rolling statistics of the closes ending at one candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandValues {
    pub mean: f64,
    pub std: f64,
    pub upper: f64,
    pub lower: f64,
}

impl BandValues {
    pub fn from_stats(mean: f64, std: f64, num_std: f64) -> Self {
        Self {
            mean,
            std,
            upper: mean + num_std * std,
            lower: mean - num_std * std,
        }
    }
}

/// A candle together with the bands computed over the window it closes.
///
/// `bands` is `None` until the trailing window is full.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedCandle {
    pub candle: Candle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bands: Option<BandValues>,
}

impl AnnotatedCandle {
    pub fn new(candle: Candle, bands: Option<BandValues>) -> Self {
        Self { candle, bands }
    }

    pub fn rolling_mean(&self) -> Option<f64> {
        self.bands.map(|b| b.mean)
    }

    pub fn rolling_std(&self) -> Option<f64> {
        self.bands.map(|b| b.std)
    }

    pub fn upper_band(&self) -> Option<f64> {
        self.bands.map(|b| b.upper)
    }

    pub fn lower_band(&self) -> Option<f64> {
        self.bands.map(|b| b.lower)
    }
}

/// Check the invariants a fetched series must hold before it is annotated:
/// finite prices, `high >= low` and strictly increasing timestamps.
pub fn validate_series(candles: &[Candle]) -> Result<(), String> {
    for (i, c) in candles.iter().enumerate() {
        if ![c.open, c.high, c.low, c.close].iter().all(|v| v.is_finite()) {
            return Err(format!("candle {} at {} has a non-finite price", i, c.timestamp));
        }
        if c.high < c.low {
            return Err(format!(
                "candle {} at {} has high {} below low {}",
                i, c.timestamp, c.high, c.low
            ));
        }
        if i > 0 && c.timestamp <= candles[i - 1].timestamp {
            return Err(format!(
                "candle {} at {} does not follow {}",
                i,
                c.timestamp,
                candles[i - 1].timestamp
            ));
        }
    }
    Ok(())
}
