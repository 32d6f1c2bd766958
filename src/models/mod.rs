//! Shared data models spanning the engine layers.

pub mod indicators;
pub mod instrument;
pub mod signal;

pub use indicators::{validate_series, AnnotatedCandle, BandValues, Candle};
pub use instrument::{display_name_for, InstrumentDescriptor, InstrumentStatus};
pub use signal::{Direction, LiveOutcome, OutcomeRecord, Signal, TradeResult};
