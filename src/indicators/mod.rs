pub mod volatility;

pub use volatility::{compute_bands, compute_bands_default, BandTracker, RollingBands};
