//! Volatility indicators: Bollinger Bands and their incremental state

pub mod bollinger;
pub mod rolling;
pub mod tracker;

pub use bollinger::*;
pub use rolling::RollingBands;
pub use tracker::BandTracker;
