//! Band state carried between live scan cycles of one instrument.

use crate::error::ScanError;
use crate::indicators::volatility::rolling::RollingBands;
use crate::models::indicators::{AnnotatedCandle, Candle};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Keeps the rolling window of closed candles so each cycle only admits the
/// candles that arrived since the previous one.
///
/// The newest candle of a fetched window is treated as still forming: its
/// bands are evaluated with [`RollingBands::peek`] and it is committed on a
/// later cycle, once a newer candle follows it.
#[derive(Debug, Clone)]
pub struct BandTracker {
    bands: RollingBands,
    recent: VecDeque<AnnotatedCandle>,
    keep: usize,
    last_committed: Option<DateTime<Utc>>,
}

impl BandTracker {
    /// `keep` closed candles are retained ahead of the forming one.
    pub fn new(window: usize, num_std: f64, keep: usize) -> Self {
        Self {
            bands: RollingBands::new(window, num_std),
            recent: VecDeque::with_capacity(keep + 1),
            keep,
            last_committed: None,
        }
    }

    pub fn last_committed(&self) -> Option<DateTime<Utc>> {
        self.last_committed
    }

    /// Fold a freshly fetched, validated window into the tracked state and
    /// return the last `keep` closed candles followed by the forming one.
    pub fn update(&mut self, candles: &[Candle]) -> Result<Vec<AnnotatedCandle>, ScanError> {
        if candles.len() < self.bands.window() {
            return Err(ScanError::InsufficientData {
                required: self.bands.window(),
                actual: candles.len(),
            });
        }

        let Some((forming, closed)) = candles.split_last() else {
            return Err(ScanError::InsufficientData {
                required: self.bands.window(),
                actual: 0,
            });
        };

        let resume_at = self.last_committed.and_then(|t| {
            closed
                .iter()
                .position(|c| c.timestamp == t)
                .map(|pos| pos + 1)
        });

        let fresh = match resume_at {
            Some(start) => &closed[start..],
            None => {
                self.reset();
                closed
            }
        };

        for candle in fresh {
            let bands = self.bands.push(candle.close);
            self.recent.push_back(AnnotatedCandle::new(*candle, bands));
            while self.recent.len() > self.keep {
                self.recent.pop_front();
            }
            self.last_committed = Some(candle.timestamp);
        }

        let mut view: Vec<AnnotatedCandle> = self.recent.iter().copied().collect();
        view.push(AnnotatedCandle::new(*forming, self.bands.peek(forming.close)));
        Ok(view)
    }

    fn reset(&mut self) {
        self.bands.clear();
        self.recent.clear();
        self.last_committed = None;
    }
}
