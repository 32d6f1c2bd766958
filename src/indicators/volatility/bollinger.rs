//! Bollinger Bands over a candle series
//!
//! Middle Band = SMA(window) of closes
//! Upper Band = Middle + (num_std * sample standard deviation)
//! Lower Band = Middle - (num_std * sample standard deviation)

use crate::error::ScanError;
use crate::indicators::volatility::rolling::RollingBands;
use crate::models::indicators::{AnnotatedCandle, Candle};

/// Annotate every candle with the bands of the trailing `window` closes.
///
/// The first `window - 1` candles carry no bands. The input is not modified.
pub fn compute_bands(
    candles: &[Candle],
    window: usize,
    num_std: f64,
) -> Result<Vec<AnnotatedCandle>, ScanError> {
    if window == 0 || candles.len() < window {
        return Err(ScanError::InsufficientData {
            required: window.max(1),
            actual: candles.len(),
        });
    }

    let mut rolling = RollingBands::new(window, num_std);
    Ok(candles
        .iter()
        .map(|candle| AnnotatedCandle::new(*candle, rolling.push(candle.close)))
        .collect())
}

/// Annotate with the default parameters (20 closes, 2 sigma).
pub fn compute_bands_default(candles: &[Candle]) -> Result<Vec<AnnotatedCandle>, ScanError> {
    compute_bands(
        candles,
        crate::config::DEFAULT_WINDOW,
        crate::config::DEFAULT_NUM_STD,
    )
}
