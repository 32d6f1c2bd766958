//! Bollinger-band mean-reversion scanner
//!
//! Detects band re-entries confirmed by a tick-volume spike, labels them
//! against a later candle (backtest) or trades them on a venue (live).

pub mod backtest;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod indicators;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod signals;

pub use error::{ConfigError, ScanError};
