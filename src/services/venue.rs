//! Trading venue interface consumed by the scan engine.

use crate::models::indicators::Candle;
use crate::models::instrument::{InstrumentDescriptor, InstrumentStatus};
use crate::models::signal::Direction;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VenueError {
    /// Session could not be established (bad credentials, refused).
    #[error("connection failed: {0}")]
    Connection(String),

    /// Venue temporarily unreachable; the call may be retried.
    #[error("venue unavailable: {0}")]
    Unavailable(String),

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("candle fetch failed: {0}")]
    Fetch(String),

    #[error("instrument {0} is closed for trading")]
    InstrumentClosed(String),

    #[error("trade rejected: {0}")]
    TradeRejected(String),

    #[error("settlement failed: {0}")]
    Settlement(String),
}

impl VenueError {
    pub fn is_transient(&self) -> bool {
        matches!(self, VenueError::Unavailable(_))
    }
}

/// Accepted trade, identified by the venue's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeHandle {
    pub trade_id: String,
}

/// Session with a trading venue. Implementations must be safe to share
/// between all instrument scans.
#[async_trait::async_trait]
pub trait VenueClient: Send + Sync {
    /// Open the session; returns the venue's greeting message.
    async fn connect(&self) -> Result<String, VenueError>;

    /// All instruments the venue lists, in listing order.
    async fn list_instruments(&self) -> Result<Vec<InstrumentDescriptor>, VenueError>;

    async fn instrument_status(&self, instrument_id: &str) -> Result<InstrumentStatus, VenueError>;

    /// Candles of `interval_seconds` covering `lookback_seconds` up to `as_of`,
    /// oldest first.
    async fn fetch_candles(
        &self,
        instrument_id: &str,
        as_of: DateTime<Utc>,
        lookback_seconds: u64,
        interval_seconds: u64,
    ) -> Result<Vec<Candle>, VenueError>;

    /// Place a timed trade. A refusal is reported as
    /// [`VenueError::TradeRejected`].
    async fn place_trade(
        &self,
        amount: f64,
        instrument_id: &str,
        direction: Direction,
        duration_seconds: u64,
    ) -> Result<TradeHandle, VenueError>;

    /// Block until the trade expires; `true` when it settled as a win.
    async fn await_settlement(&self, trade_id: &str) -> Result<bool, VenueError>;

    async fn account_balance(&self) -> Result<f64, VenueError>;

    async fn disconnect(&self) -> Result<(), VenueError>;
}

/// Connect, retrying only while the venue reports itself unavailable.
/// Any other failure surfaces at once: nothing can be scanned without a
/// session.
pub async fn connect_with_retry(venue: &dyn VenueClient) -> Result<String, VenueError> {
    use backon::{ExponentialBuilder, Retryable};
    use std::time::Duration;

    (|| async { venue.connect().await })
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(500))
                .with_max_times(3),
        )
        .sleep(tokio::time::sleep)
        .when(VenueError::is_transient)
        .notify(|err: &VenueError, dur: Duration| {
            tracing::warn!(error = %err, retry_in = ?dur, "Venue: connect failed, retrying in {:?}", dur);
        })
        .await
}
