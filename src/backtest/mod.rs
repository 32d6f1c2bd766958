//! Retrospective evaluation of the entry rule.

pub mod runner;

pub use runner::{run_backtest, BacktestReport, BacktestRunner, SkippedInstrument};
