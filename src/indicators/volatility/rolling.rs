//! Incremental rolling mean / standard deviation over a fixed window.
//!
//! Admitting a value is O(1): the oldest value is evicted and the running
//! mean and sum of squared deviations are corrected in place (sliding
//! Welford update), so long series never recompute a full window.

use crate::models::indicators::BandValues;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingBands {
    window: usize,
    num_std: f64,
    values: VecDeque<f64>,
    mean: f64,
    /// Sum of squared deviations from `mean`.
    m2: f64,
}

impl RollingBands {
    pub fn new(window: usize, num_std: f64) -> Self {
        Self {
            window,
            num_std,
            values: VecDeque::with_capacity(window + 1),
            mean: 0.0,
            m2: 0.0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.window
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.mean = 0.0;
        self.m2 = 0.0;
    }

    /// Admit `value`, evicting the oldest one once the window is full, and
    /// return the bands of the resulting window.
    pub fn push(&mut self, value: f64) -> Option<BandValues> {
        let (mean, m2) = self.admit(value);
        if self.values.len() == self.window {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.mean = mean;
        self.m2 = m2;
        self.current()
    }

    /// Bands the window would have after admitting `value`, without
    /// mutating it.
    pub fn peek(&self, value: f64) -> Option<BandValues> {
        let filled = (self.values.len() + 1).min(self.window);
        if filled < self.window {
            return None;
        }
        let (mean, m2) = self.admit(value);
        Some(self.bands(mean, m2))
    }

    /// Bands of the current window, `None` until it is full.
    pub fn current(&self) -> Option<BandValues> {
        if self.is_full() {
            Some(self.bands(self.mean, self.m2))
        } else {
            None
        }
    }

    fn admit(&self, value: f64) -> (f64, f64) {
        if self.values.len() < self.window {
            let n = (self.values.len() + 1) as f64;
            let delta = value - self.mean;
            let mean = self.mean + delta / n;
            let m2 = self.m2 + delta * (value - mean);
            (mean, m2.max(0.0))
        } else {
            let oldest = self.values.front().copied().unwrap_or(value);
            let n = self.window as f64;
            let mean = self.mean + (value - oldest) / n;
            let m2 = self.m2 + (value - oldest) * (value - mean + oldest - self.mean);
            (mean, m2.max(0.0))
        }
    }

    fn bands(&self, mean: f64, m2: f64) -> BandValues {
        // Sample standard deviation (n - 1 denominator).
        let std = (m2 / (self.window as f64 - 1.0)).sqrt();
        BandValues::from_stats(mean, std, self.num_std)
    }
}
