//! Error taxonomy for scans, backtests and configuration.

use crate::services::venue::VenueError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// The series is too short for the configured window; the instrument is
    /// skipped for this cycle.
    #[error("insufficient data: need {required} candles, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// The series annotates but is too short to label any position.
    #[error("no evaluable positions: need {required} candles, got {actual}")]
    NoEvaluablePositions { required: usize, actual: usize },

    /// The venue failed to connect, serve data or accept a trade.
    #[error("venue error: {0}")]
    Collaborator(#[from] VenueError),

    /// A fetched candle is malformed or out of order.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),
}

impl ScanError {
    /// Short label used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::InsufficientData { .. } => "insufficient_data",
            ScanError::NoEvaluablePositions { .. } => "no_evaluable_positions",
            ScanError::Collaborator(_) => "collaborator",
            ScanError::DataIntegrity(_) => "data_integrity",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
