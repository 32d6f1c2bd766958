//! Entry detection and outcome labeling.

pub mod detector;
pub mod outcome;

pub use detector::SignalDetector;
pub use outcome::{classify, OutcomeEvaluator, PendingTrade, TradeExpiry};
